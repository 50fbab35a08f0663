use super::array::{ArrayRef, EnumRef};
use super::object::Object;
use super::structs::{FieldSpec, FieldType, StructDefinition, StructRef};
use crate::frontend::grammar::DataType;

use num_enum::{IntoPrimitive, TryFromPrimitive};
use serde::Deserialize;
use std::convert::TryFrom;
use thiserror::Error;

/// Numeric failure codes of the registry's `/import` route.
#[derive(Debug, PartialEq, Eq, Clone, Copy, IntoPrimitive, TryFromPrimitive)]
#[repr(u8)]
pub enum RegistryFailure {
    MissingPackage = 0,
    NotFound = 1,
}

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Basp package: \"{0}\" was not found")]
    NotFound(String),
    #[error("No package was requested")]
    MissingPackage,
    #[error("Basp package: \"{package}\" can't be loaded: {reason}")]
    Unsupported { package: String, reason: String },
    #[error("Malformed registry payload: {0}")]
    Payload(#[from] serde_json::Error),
}

#[derive(Debug, Deserialize)]
pub struct RegistryResponse {
    pub success: bool,
    pub data: serde_json::Value,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "node", content = "data")]
pub enum SerializedNode {
    #[serde(rename = "INumberNode")]
    Number { value: f64 },
    #[serde(rename = "IStringNode")]
    Str { value: String },
    #[serde(rename = "IBooleanNode")]
    Boolean { value: BooleanRepr },
    #[serde(rename = "IArrayNode")]
    Array { elements: Vec<SerializedNode> },
    #[serde(rename = "IEnumNode")]
    Enum { elements: Vec<String> },
    #[serde(rename = "IEnumValueNode")]
    EnumValue { value: String },
    #[serde(rename = "IBaseStructNode")]
    StructDef {
        name: String,
        structure: Vec<SerializedFieldSpec>,
    },
    #[serde(rename = "IStructNode")]
    Struct {
        name: String,
        structure: Vec<SerializedField>,
    },
    #[serde(rename = "IFunctionNode")]
    Function(serde_json::Value),
}

/// The registry writes booleans either as JSON booleans or as `"True"`/`"False"`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum BooleanRepr {
    Bool(bool),
    Text(String),
}

#[derive(Debug, Deserialize)]
pub struct SerializedFieldSpec {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: String,
    #[serde(default)]
    pub writable: bool,
}

#[derive(Debug, Deserialize)]
pub struct SerializedField {
    pub name: String,
    pub value: SerializedNode,
    #[serde(default)]
    pub writable: bool,
}

/// Turns a registry answer for `package` into the value the package exports.
pub fn decode_package(package: &str, payload: &str) -> Result<Object, RegistryError> {
    let response: RegistryResponse = serde_json::from_str(payload)?;

    if !response.success {
        let code = response
            .data
            .as_u64()
            .and_then(|code| u8::try_from(code).ok())
            .and_then(|code| RegistryFailure::try_from(code).ok());
        return Err(match code {
            Some(RegistryFailure::MissingPackage) => RegistryError::MissingPackage,
            _ => RegistryError::NotFound(package.to_owned()),
        });
    }

    let node: SerializedNode = serde_json::from_value(response.data)?;
    rebuild(package, node)
}

/// Reconstructs a runtime value node by node. Struct instances get their owner links
/// and displays set up by the regular constructors.
fn rebuild(package: &str, node: SerializedNode) -> Result<Object, RegistryError> {
    let value = match node {
        SerializedNode::Number { value } => Object::Number(value),
        SerializedNode::Str { value } => Object::Str(strip_quotes(&value).to_owned()),
        SerializedNode::Boolean { value } => Object::Boolean(match value {
            BooleanRepr::Bool(b) => b,
            BooleanRepr::Text(text) => text == "True",
        }),
        SerializedNode::Array { elements } => {
            let elements = elements
                .into_iter()
                .map(|element| rebuild(package, element))
                .collect::<Result<Vec<Object>, RegistryError>>()?;
            Object::Array(ArrayRef::new(elements))
        }
        SerializedNode::Enum { elements } => Object::Enum(EnumRef::new(elements)),
        SerializedNode::EnumValue { value } => Object::EnumValue(value),
        SerializedNode::StructDef { name, structure } => {
            let fields = structure
                .into_iter()
                .map(|field| FieldSpec::new(field.name, field_type(&field.ty), field.writable))
                .collect();
            Object::StructDef(StructDefinition::new(name, fields))
        }
        SerializedNode::Struct { name, structure } => {
            let mut fields = vec![];
            for field in structure {
                let value = rebuild(package, field.value)?;
                fields.push((field.name, value, field.writable));
            }
            Object::Struct(StructRef::new(&name, fields))
        }
        SerializedNode::Function(_) => {
            return Err(RegistryError::Unsupported {
                package: package.to_owned(),
                reason: "functions can't be imported from the registry".to_owned(),
            })
        }
    };
    Ok(value)
}

fn strip_quotes(value: &str) -> &str {
    value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .unwrap_or(value)
}

/// Field types arrive as type keywords (`int`), type tags (`NUMBER`) or struct names.
fn field_type(ty: &str) -> FieldType {
    if let Some(data_type) = DataType::from_keyword(ty) {
        return FieldType::Builtin(data_type);
    }
    let data_type = match ty {
        "NUMBER" => DataType::Number,
        "STRING" => DataType::String,
        "BOOL" => DataType::Boolean,
        "ARRAY" => DataType::Array,
        "ENUM" => DataType::Enum,
        "FUNCTION" => DataType::Function,
        "ANY" => DataType::Any,
        name => return FieldType::Named(name.to_owned()),
    };
    FieldType::Builtin(data_type)
}
