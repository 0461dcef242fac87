//! Matrix-level read and write
//!
//! A matrix is stored as one group: a dataset per non-empty component plus
//! the `binsparse` attribute describing them. [`write_to_store`] and
//! [`read_from_store`] work against any [`ArrayStore`]; the path-based entry
//! points open a container file or dispatch on the file extension.

use crate::container::{ContainerReader, ContainerWriter};
use crate::descriptor::{Descriptor, BINSPARSE_KEY};
use crate::matrix_market;
use crate::options::{ReadOptions, WriteOptions};
use bsp_core::{
    file_extension, ArrayStore, ArrayStoreMut, ElementType, Error, FdatasetInfo, Matrix, Result,
    TypedArray,
};
use std::fmt;
use std::path::Path;
use tracing::{debug, info, instrument};

/// Group used when a container path names no group
pub const ROOT_GROUP: &str = "/";

/// What a bare path refers to, judged by its extension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FileKind {
    MatrixMarket,
    Container,
}

impl FileKind {
    fn of(path: &Path) -> Result<Self> {
        let name = path
            .file_name()
            .map(|name| name.to_string_lossy())
            .unwrap_or_default();
        match file_extension(&name) {
            Some(".mtx") => Ok(FileKind::MatrixMarket),
            Some(".bsp" | ".h5" | ".hdf5") => Ok(FileKind::Container),
            _ => Err(Error::UnsupportedExtension(path.display().to_string())),
        }
    }
}

/// Write every stored component of `matrix` and its descriptor to `store`
///
/// `values` is always written, the index components only when non-empty.
/// Complex arrays are stored as interleaved real parts.
pub fn write_to_store<S: ArrayStoreMut>(
    store: &mut S,
    matrix: &Matrix,
    options: &WriteOptions,
) -> Result<()> {
    matrix.validate()?;
    let descriptor = Descriptor::from_matrix(matrix);

    for (name, array) in matrix.components() {
        if name != "values" && array.is_empty() {
            continue;
        }
        let view = if array.element_type().is_complex() {
            array.as_real_view()?
        } else {
            array.view()
        };
        store.write_array(name, view, &options.dataset)?;
    }

    let document = descriptor.to_document(options.user_json.as_ref())?;
    store.set_attribute(BINSPARSE_KEY, &document)
}

/// Read the matrix described by the `binsparse` attribute of `store`
///
/// With `num_threads > 1` each component is decoded by that many workers.
pub fn read_from_store<S: ArrayStore>(store: &S, num_threads: usize) -> Result<Matrix> {
    let document = store.attribute(BINSPARSE_KEY)?.ok_or_else(|| {
        Error::InvalidMetadata(format!("no \"{BINSPARSE_KEY}\" attribute"))
    })?;
    let descriptor = Descriptor::parse(&document)?;

    let read = |name: &str| -> Result<Option<(TypedArray, bool)>> {
        let Some(tag) = descriptor.component_type(name) else {
            return Ok(None);
        };
        let (ty, is_iso) = tag?;
        let array = if num_threads > 1 {
            store.read_array_parallel(name, num_threads)?
        } else {
            store.read_array(name)?
        };
        let array = retype(name, array, ty)?;
        debug!(component = name, len = array.len(), ty = %ty, "read component");
        Ok(Some((array, is_iso)))
    };

    let (values, is_iso) = read("values")?.ok_or_else(|| {
        Error::InvalidMetadata("data_types does not list \"values\"".to_string())
    })?;
    let component = |name| {
        read(name).map(|found| found.map(|(array, _)| array).unwrap_or_default())
    };

    let matrix = Matrix {
        values,
        indices_0: component("indices_0")?,
        indices_1: component("indices_1")?,
        pointers_to_1: component("pointers_to_1")?,
        nrows: descriptor.shape[0],
        ncols: descriptor.shape[1],
        nnz: descriptor.number_of_stored_values,
        is_iso,
        format: descriptor.format,
        structure: descriptor.structure(),
    };
    matrix.validate()?;
    Ok(matrix)
}

/// Match a stored array to its described type, pairing up complex parts
fn retype(name: &str, array: TypedArray, ty: ElementType) -> Result<TypedArray> {
    let stored = array.element_type();
    let array = if ty.is_complex() && !stored.is_complex() {
        TypedArray::from_real_pairs(array)?
    } else {
        array
    };

    if array.element_type() != ty {
        return Err(Error::InvalidMetadata(format!(
            "{name} is described as {ty} but stored as {stored}"
        )));
    }
    Ok(array)
}

/// Write `matrix` into a container file
///
/// Without a group the file is truncated and the matrix goes to the root.
/// With a group an existing file is kept and the group is (re)created in it.
/// A matrix or descriptor that fails validation leaves the file untouched, as
/// does a failed write into an existing file.
#[instrument(skip(path, matrix, options), fields(path = %path.as_ref().display()))]
pub fn write_matrix<P: AsRef<Path>>(
    path: P,
    matrix: &Matrix,
    group: Option<&str>,
    options: &WriteOptions,
) -> Result<()> {
    matrix.validate()?;
    Descriptor::from_matrix(matrix).to_document(options.user_json.as_ref())?;

    let mut writer = match group {
        Some(_) => ContainerWriter::open_or_create(path.as_ref())?,
        None => ContainerWriter::create(path.as_ref())?,
    };
    let written = write_to_store(
        &mut writer.create_group(group.unwrap_or(ROOT_GROUP)),
        matrix,
        options,
    );
    if let Err(err) = written {
        writer.abandon();
        return Err(err);
    }
    writer.finish()?;

    info!(
        group = group.unwrap_or(ROOT_GROUP),
        format = %matrix.format,
        nnz = matrix.nnz,
        bytes = matrix.nbytes(),
        "wrote matrix"
    );
    Ok(())
}

/// Read a matrix from a container group, or from a bare path by extension
///
/// Without a group, `.mtx` files go to the Matrix Market reader and
/// `.bsp`/`.h5`/`.hdf5` files are read from their root group.
pub fn read_matrix<P: AsRef<Path>>(path: P, group: Option<&str>) -> Result<Matrix> {
    read_matrix_parallel(path, group, &ReadOptions::default().with_num_threads(1))
}

/// [`read_matrix`] decoding each component with `options.num_threads` workers
#[instrument(
    skip(path, options),
    fields(path = %path.as_ref().display(), threads = options.num_threads)
)]
pub fn read_matrix_parallel<P: AsRef<Path>>(
    path: P,
    group: Option<&str>,
    options: &ReadOptions,
) -> Result<Matrix> {
    let path = path.as_ref();
    let group = match group {
        Some(group) => group,
        None => match FileKind::of(path)? {
            FileKind::MatrixMarket => return matrix_market::read(path),
            FileKind::Container => ROOT_GROUP,
        },
    };

    let reader = ContainerReader::open(path)?;
    let matrix = read_from_store(&reader.group(group)?, options.num_threads)?;
    info!(
        group,
        format = %matrix.format,
        nnz = matrix.nnz,
        "read matrix"
    );
    Ok(matrix)
}

/// Read the matrix named by a `file[:group]` locator
pub fn read_matrix_at(locator: &str) -> Result<Matrix> {
    let info = FdatasetInfo::parse(locator);
    read_matrix(&info.fname, info.dataset.as_deref())
}

/// Write to the place named by a `file[:group]` locator
///
/// Bare `.mtx` paths are written as Matrix Market, carrying a string
/// `comment` from the user JSON as header comments.
pub fn write_matrix_at(locator: &str, matrix: &Matrix, options: &WriteOptions) -> Result<()> {
    let info = FdatasetInfo::parse(locator);
    if info.dataset.is_none() && FileKind::of(Path::new(&info.fname))? == FileKind::MatrixMarket {
        let comment = options
            .user_json
            .as_ref()
            .and_then(|json| json.get("comment"))
            .and_then(|comment| comment.as_str())
            .unwrap_or_default();
        return matrix_market::write_with_comments(&info.fname, matrix, comment);
    }
    write_matrix(&info.fname, matrix, info.dataset.as_deref(), options)
}

/// One matrix found by [`list_matrices`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatrixSummary {
    pub group: String,
    pub descriptor: Descriptor,
}

impl fmt::Display for MatrixSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let d = &self.descriptor;
        write!(
            f,
            "Group \"{}\": Version {} Binsparse matrix. Format {}, {} x {}. {} stored values.",
            self.group, d.version, d.format, d.shape[0], d.shape[1], d.number_of_stored_values
        )
    }
}

/// Describe every group of a container that holds a matrix
#[instrument(skip_all, fields(path = %path.as_ref().display()))]
pub fn list_matrices<P: AsRef<Path>>(path: P) -> Result<Vec<MatrixSummary>> {
    let reader = ContainerReader::open(path.as_ref())?;
    let mut summaries = Vec::new();
    for group in reader.groups() {
        let Some(document) = group.attribute(BINSPARSE_KEY)? else {
            continue;
        };
        summaries.push(MatrixSummary {
            group: group.path().to_string(),
            descriptor: Descriptor::parse(&document)?,
        });
    }
    debug!(matrices = summaries.len(), "listed container");
    Ok(summaries)
}
