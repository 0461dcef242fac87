//! The `binsparse` attribute document
//!
//! Every matrix group carries a JSON document of the form
//!
//! ```json
//! {"binsparse": {"version": "0.1", "format": "CSR", "shape": [m, n],
//!                "number_of_stored_values": nnz,
//!                "data_types": {"values": "float64", ...}}}
//! ```
//!
//! plus any user-supplied top-level keys.

use crate::BINSPARSE_VERSION;
use bsp_core::{ElementType, Error, Matrix, MatrixFormat, Result, Structure};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Key of the attribute holding the document, and of the object inside it
pub const BINSPARSE_KEY: &str = "binsparse";

const REQUIRED_KEYS: [&str; 5] = [
    "version",
    "format",
    "shape",
    "number_of_stored_values",
    "data_types",
];

/// Contents of the `binsparse` object
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Descriptor {
    pub version: String,
    pub format: MatrixFormat,
    pub shape: [usize; 2],
    pub number_of_stored_values: usize,
    /// Component name to type tag, `iso[...]`-wrapped for iso values
    pub data_types: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub structure: Option<Structure>,
}

impl Descriptor {
    /// Describe `matrix`, listing every component that will be stored
    pub fn from_matrix(matrix: &Matrix) -> Self {
        let mut data_types = BTreeMap::new();
        for (name, array) in matrix.components() {
            if name == "values" || !array.is_empty() {
                let tag = array.element_type().as_str();
                let tag = if name == "values" && matrix.is_iso {
                    format!("iso[{tag}]")
                } else {
                    tag.to_string()
                };
                data_types.insert(name.to_string(), tag);
            }
        }

        Self {
            version: BINSPARSE_VERSION.to_string(),
            format: matrix.format,
            shape: [matrix.nrows, matrix.ncols],
            number_of_stored_values: matrix.nnz,
            data_types,
            structure: (matrix.structure != Structure::General).then_some(matrix.structure),
        }
    }

    /// Parse the attribute document, checking the mandatory keys
    pub fn parse(document: &str) -> Result<Self> {
        let document: Value = serde_json::from_str(document)?;
        let binsparse = document
            .get(BINSPARSE_KEY)
            .and_then(Value::as_object)
            .ok_or_else(|| {
                Error::InvalidMetadata(format!("document has no \"{BINSPARSE_KEY}\" object"))
            })?;

        if let Some(key) = REQUIRED_KEYS.iter().find(|key| !binsparse.contains_key(**key)) {
            return Err(Error::InvalidMetadata(format!("missing required key \"{key}\"")));
        }

        Descriptor::deserialize(Value::Object(binsparse.clone()))
            .map_err(|err| Error::InvalidMetadata(err.to_string()))
    }

    /// Render the attribute document, merging `user_json` at the top level
    ///
    /// The `binsparse` key always holds this descriptor, even if the user
    /// object carries one.
    pub fn to_document(&self, user_json: Option<&Map<String, Value>>) -> Result<String> {
        let mut document = user_json.cloned().unwrap_or_default();
        document.insert(BINSPARSE_KEY.to_string(), serde_json::to_value(self)?);
        Ok(serde_json::to_string_pretty(&Value::Object(document))?)
    }

    /// Element type of component `name` and whether it is iso-valued
    pub fn component_type(&self, name: &str) -> Option<Result<(ElementType, bool)>> {
        self.data_types.get(name).map(|tag| parse_type_tag(tag))
    }

    /// Structure, defaulting to general when the key is absent
    pub fn structure(&self) -> Structure {
        self.structure.unwrap_or_default()
    }
}

/// Split an `iso[...]` wrapper off a type tag
pub fn parse_type_tag(tag: &str) -> Result<(ElementType, bool)> {
    match tag.strip_prefix("iso[").and_then(|inner| inner.strip_suffix(']')) {
        Some(inner) => Ok((inner.parse()?, true)),
        None => Ok((tag.parse()?, false)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bsp_core::TypedArray;
    use num_complex::Complex64;
    use serde_json::json;

    fn csr() -> Matrix {
        Matrix::csr(
            2,
            3,
            TypedArray::from(vec![0u8, 1, 2]),
            TypedArray::from(vec![2u8, 0]),
            TypedArray::from(vec![1.0f32, 2.0]),
        )
    }

    #[test]
    fn test_document_layout() {
        let document = Descriptor::from_matrix(&csr()).to_document(None).unwrap();
        let value: Value = serde_json::from_str(&document).unwrap();
        assert_eq!(
            value,
            json!({"binsparse": {
                "version": "0.1",
                "format": "CSR",
                "shape": [2, 3],
                "number_of_stored_values": 2,
                "data_types": {
                    "values": "float32",
                    "indices_1": "uint8",
                    "pointers_to_1": "uint8"
                }
            }})
        );
    }

    #[test]
    fn test_iso_complex_and_structure() {
        let mut matrix = Matrix::coo(
            3,
            3,
            TypedArray::from(vec![0u16, 2]),
            TypedArray::from(vec![0u16, 1]),
            TypedArray::from(vec![Complex64::new(1.0, -1.0)]),
        );
        matrix.nnz = 2;
        matrix.is_iso = true;
        matrix.structure = Structure::HermitianLower;

        let descriptor = Descriptor::from_matrix(&matrix);
        assert_eq!(descriptor.data_types["values"], "iso[complex[float64]]");
        assert_eq!(descriptor.structure, Some(Structure::HermitianLower));

        let parsed = Descriptor::parse(&descriptor.to_document(None).unwrap()).unwrap();
        assert_eq!(parsed, descriptor);
        assert_eq!(
            parsed.component_type("values").unwrap().unwrap(),
            (ElementType::Complex64, true)
        );
        assert_eq!(
            parsed.component_type("indices_0").unwrap().unwrap(),
            (ElementType::UInt16, false)
        );
        assert!(parsed.component_type("pointers_to_1").is_none());
    }

    #[test]
    fn test_user_json_merge() {
        let user = json!({"comment": "% generated", "binsparse": "ignored", "tool": {"v": 2}});
        let document = Descriptor::from_matrix(&csr())
            .to_document(user.as_object())
            .unwrap();
        let value: Value = serde_json::from_str(&document).unwrap();
        assert_eq!(value["comment"], "% generated");
        assert_eq!(value["tool"]["v"], 2);
        assert_eq!(value["binsparse"]["format"], "CSR");
    }

    #[test]
    fn test_structure_defaults_to_general() {
        let document = r#"{"binsparse": {"version": "0.1", "format": "COO", "shape": [1, 1],
            "number_of_stored_values": 0, "data_types": {"values": "int8"}}}"#;
        let descriptor = Descriptor::parse(document).unwrap();
        assert_eq!(descriptor.structure(), Structure::General);
        assert_eq!(descriptor.format, MatrixFormat::Coor);
    }

    #[test]
    fn test_missing_and_malformed_keys() {
        let missing_shape = r#"{"binsparse": {"version": "0.1", "format": "COO",
            "number_of_stored_values": 0, "data_types": {}}}"#;
        assert!(matches!(
            Descriptor::parse(missing_shape),
            Err(Error::InvalidMetadata(msg)) if msg.contains("shape")
        ));

        let bad_shape = r#"{"binsparse": {"version": "0.1", "format": "COO", "shape": [1, 2, 3],
            "number_of_stored_values": 0, "data_types": {}}}"#;
        assert!(matches!(
            Descriptor::parse(bad_shape),
            Err(Error::InvalidMetadata(_))
        ));

        assert!(matches!(
            Descriptor::parse(r#"{"other": {}}"#),
            Err(Error::InvalidMetadata(_))
        ));
        assert!(matches!(Descriptor::parse("not json"), Err(Error::Json(_))));
    }

    #[test]
    fn test_parse_type_tag() {
        assert_eq!(parse_type_tag("bint8").unwrap(), (ElementType::Bint8, false));
        assert_eq!(
            parse_type_tag("iso[float64]").unwrap(),
            (ElementType::Float64, true)
        );
        assert!(matches!(parse_type_tag("iso[float128]"), Err(Error::UnknownType(_))));
    }
}
