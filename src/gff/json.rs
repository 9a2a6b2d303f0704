//! JSON bridge for the GFF in-memory tree, built on `serde_json::Value`.

use kotor_common::error::Error;
use kotor_common::resref::ResRef;
use serde_json::{json, Value};

use super::field::{GffField, GffFieldValue, GffList, GffStruct, LocalizedString, LocalizedSubstring};

pub fn to_json(root: &GffStruct) -> Value {
    struct_to_json(root)
}

fn struct_to_json(s: &GffStruct) -> Value {
    let mut fields = serde_json::Map::new();
    for field in s {
        fields.insert(field.label.clone(), field_value_to_json(&field.value));
    }
    json!({
        "__struct_id": s.struct_id,
        "fields": fields,
    })
}

fn field_value_to_json(value: &GffFieldValue) -> Value {
    match value {
        GffFieldValue::UInt8(v) => json!({"type": "uint8", "value": v}),
        GffFieldValue::Int8(v) => json!({"type": "int8", "value": v}),
        GffFieldValue::UInt16(v) => json!({"type": "uint16", "value": v}),
        GffFieldValue::Int16(v) => json!({"type": "int16", "value": v}),
        GffFieldValue::UInt32(v) => json!({"type": "uint32", "value": v}),
        GffFieldValue::Int32(v) => json!({"type": "int32", "value": v}),
        GffFieldValue::UInt64(v) => json!({"type": "uint64", "value": v}),
        GffFieldValue::Int64(v) => json!({"type": "int64", "value": v}),
        GffFieldValue::Single(v) => json!({"type": "single", "value": v}),
        GffFieldValue::Double(v) => json!({"type": "double", "value": v}),
        GffFieldValue::ExoString(v) => json!({"type": "exostring", "value": v}),
        GffFieldValue::ResRef(v) => json!({"type": "resref", "value": v.as_str()}),
        GffFieldValue::Binary(v) => json!({"type": "void", "value": v}),
        GffFieldValue::Struct(inner) => json!({"type": "struct", "value": struct_to_json(inner)}),
        GffFieldValue::List(list) => json!({
            "type": "list",
            "value": list.structs.iter().map(struct_to_json).collect::<Vec<_>>(),
        }),
        GffFieldValue::Orientation(v) => json!({"type": "orientation", "value": v}),
        GffFieldValue::Vector3(v) => json!({"type": "vector3", "value": v}),
        GffFieldValue::LocalizedString(locstring) => json!({
            "type": "locstring",
            "value": {
                "string_ref": locstring.string_ref,
                "substrings": locstring.substrings.iter().map(|s| json!({
                    "language_id": s.language_id,
                    "string": s.string,
                })).collect::<Vec<_>>(),
            },
        }),
    }
}

pub fn from_json(value: &Value) -> Result<GffStruct, Error> {
    struct_from_json(value)
}

fn expect_object<'a>(value: &'a Value, what: &str) -> Result<&'a serde_json::Map<String, Value>, Error> {
    value
        .as_object()
        .ok_or_else(|| Error::StructuralError(format!("expected a JSON object for {what}")))
}

fn struct_from_json(value: &Value) -> Result<GffStruct, Error> {
    let object = expect_object(value, "GFF struct")?;
    let struct_id = object
        .get("__struct_id")
        .and_then(Value::as_u64)
        .ok_or_else(|| Error::StructuralError(String::from("GFF struct is missing __struct_id")))? as u32;
    let mut result = GffStruct::new(struct_id);

    let fields = object
        .get("fields")
        .and_then(Value::as_object)
        .ok_or_else(|| Error::StructuralError(String::from("GFF struct is missing fields")))?;
    for (label, field_value) in fields {
        result.set(label, field_value_from_json(field_value)?);
    }
    Ok(result)
}

fn field_value_from_json(value: &Value) -> Result<GffFieldValue, Error> {
    let object = expect_object(value, "GFF field")?;
    let type_name = object
        .get("type")
        .and_then(Value::as_str)
        .ok_or_else(|| Error::StructuralError(String::from("GFF field is missing type")))?;
    let inner = object
        .get("value")
        .ok_or_else(|| Error::StructuralError(String::from("GFF field is missing value")))?;

    let as_u64 = |v: &Value| v.as_u64().ok_or_else(|| Error::StructuralError(String::from("expected integer")));
    let as_i64 = |v: &Value| v.as_i64().ok_or_else(|| Error::StructuralError(String::from("expected integer")));
    let as_f64 = |v: &Value| v.as_f64().ok_or_else(|| Error::StructuralError(String::from("expected float")));
    let as_str = |v: &Value| {
        v.as_str()
            .map(String::from)
            .ok_or_else(|| Error::StructuralError(String::from("expected string")))
    };

    Ok(match type_name {
        "uint8" => GffFieldValue::UInt8(as_u64(inner)? as u8),
        "int8" => GffFieldValue::Int8(as_i64(inner)? as i8),
        "uint16" => GffFieldValue::UInt16(as_u64(inner)? as u16),
        "int16" => GffFieldValue::Int16(as_i64(inner)? as i16),
        "uint32" => GffFieldValue::UInt32(as_u64(inner)? as u32),
        "int32" => GffFieldValue::Int32(as_i64(inner)? as i32),
        "uint64" => GffFieldValue::UInt64(as_u64(inner)?),
        "int64" => GffFieldValue::Int64(as_i64(inner)?),
        "single" => GffFieldValue::Single(as_f64(inner)? as f32),
        "double" => GffFieldValue::Double(as_f64(inner)?),
        "exostring" => GffFieldValue::ExoString(as_str(inner)?),
        "resref" => GffFieldValue::ResRef(ResRef::from_reader_bytes(&as_str(inner)?)),
        "void" => {
            let array = inner
                .as_array()
                .ok_or_else(|| Error::StructuralError(String::from("expected byte array")))?;
            let bytes = array
                .iter()
                .map(|v| as_u64(v).map(|n| n as u8))
                .collect::<Result<Vec<u8>, Error>>()?;
            GffFieldValue::Binary(bytes)
        }
        "struct" => GffFieldValue::Struct(Box::new(struct_from_json(inner)?)),
        "list" => {
            let array = inner
                .as_array()
                .ok_or_else(|| Error::StructuralError(String::from("expected list of structs")))?;
            let mut list = GffList::new();
            for entry in array {
                list.structs.push(struct_from_json(entry)?);
            }
            GffFieldValue::List(list)
        }
        "orientation" => GffFieldValue::Orientation(vector4_from_json(inner)?),
        "vector3" => GffFieldValue::Vector3(vector3_from_json(inner)?),
        "locstring" => {
            let object = expect_object(inner, "locstring")?;
            let string_ref = object
                .get("string_ref")
                .and_then(Value::as_i64)
                .ok_or_else(|| Error::StructuralError(String::from("locstring missing string_ref")))? as i32;
            let substrings = object
                .get("substrings")
                .and_then(Value::as_array)
                .ok_or_else(|| Error::StructuralError(String::from("locstring missing substrings")))?
                .iter()
                .map(|entry| {
                    let object = expect_object(entry, "locstring substring")?;
                    Ok(LocalizedSubstring {
                        language_id: object
                            .get("language_id")
                            .and_then(Value::as_u64)
                            .ok_or_else(|| Error::StructuralError(String::from("substring missing language_id")))?
                            as u32,
                        string: object
                            .get("string")
                            .and_then(Value::as_str)
                            .map(String::from)
                            .ok_or_else(|| Error::StructuralError(String::from("substring missing string")))?,
                    })
                })
                .collect::<Result<Vec<_>, Error>>()?;
            GffFieldValue::LocalizedString(LocalizedString { string_ref, substrings })
        }
        other => {
            return Err(Error::StructuralError(format!(
                "unrecognized GFF JSON field type {other:?}"
            )))
        }
    })
}

fn vector3_from_json(value: &Value) -> Result<[f32; 3], Error> {
    let array = value
        .as_array()
        .ok_or_else(|| Error::StructuralError(String::from("expected a 3-element array")))?;
    if array.len() != 3 {
        return Err(Error::StructuralError(String::from("vector3 requires exactly 3 components")));
    }
    let mut out = [0f32; 3];
    for (i, v) in array.iter().enumerate() {
        out[i] = v.as_f64().ok_or_else(|| Error::StructuralError(String::from("expected float")))? as f32;
    }
    Ok(out)
}

fn vector4_from_json(value: &Value) -> Result<[f32; 4], Error> {
    let array = value
        .as_array()
        .ok_or_else(|| Error::StructuralError(String::from("expected a 4-element array")))?;
    if array.len() != 4 {
        return Err(Error::StructuralError(String::from("orientation requires exactly 4 components")));
    }
    let mut out = [0f32; 4];
    for (i, v) in array.iter().enumerate() {
        out[i] = v.as_f64().ok_or_else(|| Error::StructuralError(String::from("expected float")))? as f32;
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_round_trip() {
        let mut root = GffStruct::new(0xffff_ffff);
        root.set("HP", GffFieldValue::Int16(100));
        root.set("Tag", GffFieldValue::ExoString(String::from("P_BASTILA")));
        root.set("Position", GffFieldValue::Vector3([1.0, 2.0, 3.0]));

        let value = to_json(&root);
        let read_back = from_json(&value).unwrap();
        assert_eq!(read_back, root);
    }
}
