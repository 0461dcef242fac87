//! Matrix Market text format
//!
//! Reads `coordinate` and `array` files of every value type into a
//! [`Matrix`], and writes COO matrices back out as `coordinate` files.
//! Coordinate input is sorted by `(row, col)` so the result is row-sorted
//! COO. Symmetric files keep only the stored triangle; mirrored entries are
//! not generated.

use bsp_core::{
    pick_integer_type, ElementType, Error, Matrix, MatrixFormat, Result, Structure, TypedArray,
};
use num_complex::Complex64;
use std::fmt;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;
use std::str::{FromStr, SplitWhitespace};
use tracing::{debug, info, instrument};

const BANNER: &str = "%%MatrixMarket";

/// Layout of the data section
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MmFormat {
    Coordinate,
    Array,
}

/// Value type of the data section
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MmType {
    Real,
    Integer,
    Complex,
    Pattern,
}

/// Symmetry declared in the header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MmStructure {
    General,
    Symmetric,
    Hermitian,
    SkewSymmetric,
}

macro_rules! impl_mm_token {
    ($ty:ident { $($variant:ident => $token:literal),+ $(,)? }) => {
        impl $ty {
            pub const fn as_str(self) -> &'static str {
                match self {
                    $($ty::$variant => $token),+
                }
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $ty {
            type Err = String;

            /// Tokens are matched case-insensitively
            fn from_str(s: &str) -> std::result::Result<Self, String> {
                match s.to_ascii_lowercase().as_str() {
                    $($token => Ok($ty::$variant),)+
                    other => Err(format!(
                        concat!("unknown ", stringify!($ty), " \"{}\""),
                        other
                    )),
                }
            }
        }
    };
}

impl_mm_token!(MmFormat {
    Coordinate => "coordinate",
    Array => "array",
});

impl_mm_token!(MmType {
    Real => "real",
    Integer => "integer",
    Complex => "complex",
    Pattern => "pattern",
});

impl_mm_token!(MmStructure {
    General => "general",
    Symmetric => "symmetric",
    Hermitian => "hermitian",
    SkewSymmetric => "skew-symmetric",
});

impl MmType {
    /// Element type used to hold values of this kind
    pub const fn element_type(self) -> ElementType {
        match self {
            MmType::Real => ElementType::Float64,
            MmType::Integer => ElementType::Int64,
            MmType::Complex => ElementType::Complex64,
            MmType::Pattern => ElementType::Bint8,
        }
    }

    /// Text type for a matrix; iso matrices are written as patterns
    pub fn of(matrix: &Matrix) -> Self {
        let ty = matrix.values.element_type();
        if matrix.is_iso {
            MmType::Pattern
        } else if ty.is_complex() {
            MmType::Complex
        } else if ty.is_float() {
            MmType::Real
        } else {
            MmType::Integer
        }
    }
}

impl MmStructure {
    /// Stored triangle for this symmetry
    pub const fn structure(self) -> Structure {
        match self {
            MmStructure::General => Structure::General,
            MmStructure::Symmetric => Structure::SymmetricLower,
            MmStructure::Hermitian => Structure::HermitianLower,
            MmStructure::SkewSymmetric => Structure::SkewSymmetricLower,
        }
    }

    /// Text structure for a matrix structure; upper triangles have none
    pub const fn from_structure(structure: Structure) -> Option<Self> {
        match structure {
            Structure::General => Some(MmStructure::General),
            Structure::SymmetricLower => Some(MmStructure::Symmetric),
            Structure::HermitianLower => Some(MmStructure::Hermitian),
            Structure::SkewSymmetricLower => Some(MmStructure::SkewSymmetric),
            _ => None,
        }
    }
}

/// Header, comments and dimensions of a Matrix Market file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MmMetadata {
    pub nrows: usize,
    pub ncols: usize,
    /// Declared entries; `nrows * ncols` for array files
    pub nnz: usize,
    pub format: MmFormat,
    pub value_type: MmType,
    pub structure: MmStructure,
    /// `%` comment lines joined by newlines, without a trailing newline
    pub comments: String,
}

/// Line-counting reader over the text
struct Lines<R> {
    reader: R,
    line: usize,
    buffer: String,
}

impl<R: BufRead> Lines<R> {
    fn new(reader: R) -> Self {
        Self {
            reader,
            line: 0,
            buffer: String::new(),
        }
    }

    /// Next line number and text without its terminator, or `None` at end
    /// of input
    fn next_line(&mut self) -> Result<Option<(usize, &str)>> {
        self.buffer.clear();
        if self.reader.read_line(&mut self.buffer)? == 0 {
            return Ok(None);
        }
        self.line += 1;
        Ok(Some((self.line, self.buffer.trim_end_matches(['\n', '\r']))))
    }

    fn error(&self, message: impl Into<String>) -> Error {
        parse_error(self.line, message)
    }
}

fn parse_error(line: usize, message: impl Into<String>) -> Error {
    Error::MatrixMarket {
        line,
        message: message.into(),
    }
}

/// Whitespace-separated fields of one line
struct Fields<'a> {
    tokens: SplitWhitespace<'a>,
    line: usize,
}

impl<'a> Fields<'a> {
    fn new(text: &'a str, line: usize) -> Self {
        Self {
            tokens: text.split_whitespace(),
            line,
        }
    }

    fn next<T: FromStr>(&mut self, what: &str) -> Result<T> {
        let token = self
            .tokens
            .next()
            .ok_or_else(|| parse_error(self.line, format!("missing {what}")))?;
        token
            .parse()
            .map_err(|_| parse_error(self.line, format!("invalid {what} \"{token}\"")))
    }

    /// 1-based index converted to 0-based, checked against `bound`
    fn index(&mut self, what: &str, bound: usize) -> Result<usize> {
        let index: usize = self.next(what)?;
        if index == 0 || index > bound {
            return Err(parse_error(
                self.line,
                format!("{what} {index} outside 1..={bound}"),
            ));
        }
        Ok(index - 1)
    }
}

fn read_header<R: BufRead>(lines: &mut Lines<R>) -> Result<MmMetadata> {
    let Some((_, banner)) = lines.next_line()? else {
        return Err(lines.error("empty file"));
    };
    let banner = banner.to_string();

    let mut tokens = banner.split_whitespace();
    let (Some(magic), Some(object), Some(format), Some(value_type), Some(structure)) = (
        tokens.next(),
        tokens.next(),
        tokens.next(),
        tokens.next(),
        tokens.next(),
    ) else {
        return Err(lines.error(format!("malformed header \"{banner}\"")));
    };
    if !magic.eq_ignore_ascii_case(BANNER) || !object.eq_ignore_ascii_case("matrix") {
        return Err(lines.error(format!("malformed header \"{banner}\"")));
    }
    let format: MmFormat = format.parse().map_err(|msg: String| lines.error(msg))?;
    let value_type: MmType = value_type.parse().map_err(|msg: String| lines.error(msg))?;
    let structure: MmStructure = structure.parse().map_err(|msg: String| lines.error(msg))?;

    let mut comments = String::new();
    let (size_number, size_line) = loop {
        let Some((number, line)) = lines.next_line()? else {
            return Err(lines.error("missing size line"));
        };
        if line.starts_with('%') {
            comments.push_str(line);
            comments.push('\n');
        } else if !line.trim().is_empty() {
            break (number, line.to_string());
        }
    };
    if comments.ends_with('\n') {
        comments.pop();
    }

    let mut fields = Fields::new(&size_line, size_number);
    let nrows = fields.next("row count")?;
    let ncols = fields.next("column count")?;
    let nnz = match format {
        MmFormat::Coordinate => fields.next("entry count")?,
        MmFormat::Array => usize::checked_mul(nrows, ncols)
            .ok_or_else(|| lines.error("matrix dimensions overflow"))?,
    };

    Ok(MmMetadata {
        nrows,
        ncols,
        nnz,
        format,
        value_type,
        structure,
        comments,
    })
}

/// Read only the header, comments and size line of a file
#[instrument(skip_all, fields(path = %path.as_ref().display()))]
pub fn read_metadata<P: AsRef<Path>>(path: P) -> Result<MmMetadata> {
    let mut lines = Lines::new(BufReader::new(File::open(path.as_ref())?));
    read_header(&mut lines)
}

/// Read a Matrix Market file
#[instrument(skip_all, fields(path = %path.as_ref().display()))]
pub fn read<P: AsRef<Path>>(path: P) -> Result<Matrix> {
    let matrix = read_from(BufReader::new(File::open(path.as_ref())?))?;
    info!(
        nrows = matrix.nrows,
        ncols = matrix.ncols,
        nnz = matrix.nnz,
        format = %matrix.format,
        "read Matrix Market file"
    );
    Ok(matrix)
}

/// Read Matrix Market text from any buffered reader
pub fn read_from<R: BufRead>(reader: R) -> Result<Matrix> {
    let mut lines = Lines::new(reader);
    let metadata = read_header(&mut lines)?;
    debug!(
        format = %metadata.format,
        value_type = %metadata.value_type,
        structure = %metadata.structure,
        nnz = metadata.nnz,
        "parsed Matrix Market header"
    );

    match metadata.format {
        MmFormat::Array => read_array(&mut lines, &metadata),
        MmFormat::Coordinate => read_coordinate(&mut lines, &metadata),
    }
}

/// Store one value of `value_type` parsed from `fields` at `index`
fn read_value(
    fields: &mut Fields<'_>,
    value_type: MmType,
    values: &mut TypedArray,
    index: usize,
) -> Result<()> {
    match value_type {
        MmType::Real => values.write(index, fields.next::<f64>("value")?),
        MmType::Integer => values.write(index, fields.next::<i64>("value")?),
        MmType::Complex => {
            let re = fields.next::<f64>("real part")?;
            let im = fields.next::<f64>("imaginary part")?;
            values.write(index, Complex64::new(re, im));
        }
        MmType::Pattern => {}
    }
    Ok(())
}

fn read_array<R: BufRead>(lines: &mut Lines<R>, metadata: &MmMetadata) -> Result<Matrix> {
    if metadata.value_type == MmType::Pattern {
        return Err(lines.error("array files cannot hold pattern values"));
    }

    let (nrows, ncols) = (metadata.nrows, metadata.ncols);
    let mut values = TypedArray::new(metadata.nnz, metadata.value_type.element_type())?;

    let mut count = 0;
    while let Some((number, line)) = lines.next_line()? {
        if line.trim().is_empty() {
            continue;
        }
        if count == metadata.nnz {
            return Err(parse_error(number, format!("more than {} values", metadata.nnz)));
        }
        let mut fields = Fields::new(line, number);
        let i = count % ncols;
        let j = count / ncols;
        read_value(&mut fields, metadata.value_type, &mut values, i * nrows + j)?;
        count += 1;
    }
    if count != metadata.nnz {
        return Err(lines.error(format!("expected {} values, found {count}", metadata.nnz)));
    }

    Ok(Matrix {
        values,
        nrows,
        ncols,
        nnz: metadata.nnz,
        format: MatrixFormat::DMAT,
        structure: metadata.structure.structure(),
        ..Default::default()
    })
}

fn read_coordinate<R: BufRead>(lines: &mut Lines<R>, metadata: &MmMetadata) -> Result<Matrix> {
    let nnz = metadata.nnz;
    let index_type = pick_integer_type(metadata.nrows.max(metadata.ncols));
    let is_iso = metadata.value_type == MmType::Pattern;

    let mut rows = TypedArray::new(nnz, index_type)?;
    let mut cols = TypedArray::new(nnz, index_type)?;
    let mut values = if is_iso {
        TypedArray::bint8(vec![1])
    } else {
        TypedArray::new(nnz, metadata.value_type.element_type())?
    };

    let mut count = 0;
    while let Some((number, line)) = lines.next_line()? {
        if line.trim().is_empty() {
            continue;
        }
        if count == nnz {
            return Err(parse_error(number, format!("more than {nnz} entries")));
        }
        let mut fields = Fields::new(line, number);
        rows.write(count, fields.index("row index", metadata.nrows)? as u64);
        cols.write(count, fields.index("column index", metadata.ncols)? as u64);
        read_value(&mut fields, metadata.value_type, &mut values, count)?;
        count += 1;
    }
    if count != nnz {
        return Err(lines.error(format!("expected {nnz} entries, found {count}")));
    }

    // stable, so duplicate coordinates keep their file order
    let mut order: Vec<usize> = (0..nnz).collect();
    order.sort_by(|&a, &b| {
        (rows.index(a), cols.index(a)).cmp(&(rows.index(b), cols.index(b)))
    });
    rows.permute(&order);
    cols.permute(&order);
    if !is_iso {
        values.permute(&order);
    }

    Ok(Matrix {
        values,
        indices_0: rows,
        indices_1: cols,
        nrows: metadata.nrows,
        ncols: metadata.ncols,
        nnz,
        is_iso,
        format: MatrixFormat::COO,
        structure: metadata.structure.structure(),
        ..Default::default()
    })
}

/// Format a float the way C's `%.17g` does
///
/// Seventeen significant digits always round-trip an `f64`.
pub fn format_real(value: f64) -> String {
    const PRECISION: i32 = 17;

    if value.is_nan() {
        return "nan".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "inf" } else { "-inf" }.to_string();
    }
    if value == 0.0 {
        return if value.is_sign_negative() { "-0" } else { "0" }.to_string();
    }

    let scientific = format!("{:.*e}", (PRECISION - 1) as usize, value);
    let (mantissa, exponent) = scientific.split_once('e').unwrap_or((&scientific, "0"));
    let exponent: i32 = exponent.parse().unwrap_or(0);

    if (-4..PRECISION).contains(&exponent) {
        let fixed = format!("{:.*}", (PRECISION - 1 - exponent) as usize, value);
        trim_fraction(&fixed).to_string()
    } else {
        let sign = if exponent < 0 { '-' } else { '+' };
        format!("{}e{sign}{:02}", trim_fraction(mantissa), exponent.abs())
    }
}

fn trim_fraction(number: &str) -> &str {
    if number.contains('.') {
        number.trim_end_matches('0').trim_end_matches('.')
    } else {
        number
    }
}

/// Write a COO matrix as a Matrix Market coordinate file
#[instrument(skip_all, fields(path = %path.as_ref().display()))]
pub fn write<P: AsRef<Path>>(path: P, matrix: &Matrix) -> Result<()> {
    write_with_comments(path, matrix, "")
}

/// Write a COO matrix, placing `comments` after the header
///
/// Lines of `comments` that do not start with `%` are prefixed with one.
pub fn write_with_comments<P: AsRef<Path>>(
    path: P,
    matrix: &Matrix,
    comments: &str,
) -> Result<()> {
    check_writable(matrix)?;
    let mut writer = BufWriter::new(File::create(path.as_ref())?);
    write_commented_to(&mut writer, matrix, comments)?;
    writer.flush()?;
    info!(path = %path.as_ref().display(), nnz = matrix.nnz, "wrote Matrix Market file");
    Ok(())
}

/// Write a COO matrix as Matrix Market text
pub fn write_to<W: Write>(writer: W, matrix: &Matrix) -> Result<()> {
    write_commented_to(writer, matrix, "")
}

/// Structure line for `matrix`, or the reason it cannot be written
fn check_writable(matrix: &Matrix) -> Result<MmStructure> {
    if matrix.format != MatrixFormat::COO {
        return Err(Error::Conversion(format!(
            "Matrix Market output needs a COO matrix, found {}",
            matrix.format
        )));
    }
    matrix.validate()?;
    MmStructure::from_structure(matrix.structure).ok_or_else(|| {
        Error::Conversion(format!(
            "{} structure has no Matrix Market equivalent",
            matrix.structure
        ))
    })
}

fn write_commented_to<W: Write>(mut writer: W, matrix: &Matrix, comments: &str) -> Result<()> {
    let structure = check_writable(matrix)?;
    let value_type = MmType::of(matrix);

    writeln!(
        writer,
        "{BANNER} matrix {} {value_type} {structure}",
        MmFormat::Coordinate
    )?;
    for line in comments.lines() {
        if line.starts_with('%') {
            writeln!(writer, "{line}")?;
        } else {
            writeln!(writer, "%{line}")?;
        }
    }
    writeln!(writer, "{} {} {}", matrix.nrows, matrix.ncols, matrix.nnz)?;

    for k in 0..matrix.nnz {
        let i = matrix.indices_0.index(k) + 1;
        let j = matrix.indices_1.index(k) + 1;
        match value_type {
            MmType::Pattern => writeln!(writer, "{i} {j}")?,
            MmType::Integer => writeln!(writer, "{i} {j} {}", matrix.values.read::<i64>(k))?,
            MmType::Real => writeln!(
                writer,
                "{i} {j} {}",
                format_real(matrix.values.read::<f64>(k))
            )?,
            MmType::Complex => {
                let value = matrix.values.read::<Complex64>(k);
                writeln!(
                    writer,
                    "{i} {j} {} {}",
                    format_real(value.re),
                    format_real(value.im)
                )?
            }
        }
    }
    Ok(())
}
