//! XML bridge for the GFF in-memory tree. Lossless for every field type,
//! including `LocalizedString`, `Orientation` and `Vector3`.

use std::io::Cursor;

use kotor_common::error::Error;
use kotor_common::resref::ResRef;
use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::reader::Reader;
use quick_xml::writer::Writer;

use super::field::{GffField, GffFieldValue, GffList, GffStruct, LocalizedString, LocalizedSubstring};

fn type_name(value: &GffFieldValue) -> &'static str {
    match value {
        GffFieldValue::UInt8(_) => "uint8",
        GffFieldValue::Int8(_) => "int8",
        GffFieldValue::UInt16(_) => "uint16",
        GffFieldValue::Int16(_) => "int16",
        GffFieldValue::UInt32(_) => "uint32",
        GffFieldValue::Int32(_) => "int32",
        GffFieldValue::UInt64(_) => "uint64",
        GffFieldValue::Int64(_) => "int64",
        GffFieldValue::Single(_) => "single",
        GffFieldValue::Double(_) => "double",
        GffFieldValue::ExoString(_) => "exostring",
        GffFieldValue::ResRef(_) => "resref",
        GffFieldValue::LocalizedString(_) => "locstring",
        GffFieldValue::Binary(_) => "void",
        GffFieldValue::Struct(_) => "struct",
        GffFieldValue::List(_) => "list",
        GffFieldValue::Orientation(_) => "orientation",
        GffFieldValue::Vector3(_) => "vector3",
    }
}

pub fn to_xml(root: &GffStruct) -> String {
    let mut buffer = Vec::new();
    let mut writer = Writer::new_with_indent(Cursor::new(&mut buffer), b' ', 2);
    write_struct(&mut writer, None, root);
    String::from_utf8(buffer).expect("GFF XML output is always valid UTF-8")
}

fn write_struct<W: std::io::Write>(writer: &mut Writer<W>, label: Option<&str>, s: &GffStruct) {
    let mut start = BytesStart::new("struct");
    if let Some(label) = label {
        start.push_attribute(("label", label));
    }
    start.push_attribute(("id", s.struct_id.to_string().as_str()));
    writer.write_event(Event::Start(start)).unwrap();
    for field in s {
        write_field(writer, field);
    }
    writer.write_event(Event::End(BytesEnd::new("struct"))).unwrap();
}

fn write_field<W: std::io::Write>(writer: &mut Writer<W>, field: &GffField) {
    match &field.value {
        GffFieldValue::Struct(inner) => {
            write_struct(writer, Some(&field.label), inner);
            return;
        }
        GffFieldValue::List(list) => {
            let mut start = BytesStart::new("list");
            start.push_attribute(("label", field.label.as_str()));
            writer.write_event(Event::Start(start)).unwrap();
            for item in &list.structs {
                write_struct(writer, None, item);
            }
            writer.write_event(Event::End(BytesEnd::new("list"))).unwrap();
            return;
        }
        _ => {}
    }

    let mut start = BytesStart::new("field");
    start.push_attribute(("label", field.label.as_str()));
    start.push_attribute(("type", type_name(&field.value)));
    writer.write_event(Event::Start(start)).unwrap();

    match &field.value {
        GffFieldValue::UInt8(v) => write_text(writer, &v.to_string()),
        GffFieldValue::Int8(v) => write_text(writer, &v.to_string()),
        GffFieldValue::UInt16(v) => write_text(writer, &v.to_string()),
        GffFieldValue::Int16(v) => write_text(writer, &v.to_string()),
        GffFieldValue::UInt32(v) => write_text(writer, &v.to_string()),
        GffFieldValue::Int32(v) => write_text(writer, &v.to_string()),
        GffFieldValue::UInt64(v) => write_text(writer, &v.to_string()),
        GffFieldValue::Int64(v) => write_text(writer, &v.to_string()),
        GffFieldValue::Single(v) => write_text(writer, &v.to_string()),
        GffFieldValue::Double(v) => write_text(writer, &v.to_string()),
        GffFieldValue::ExoString(v) => write_text(writer, v),
        GffFieldValue::ResRef(v) => write_text(writer, v.as_str()),
        GffFieldValue::Binary(v) => write_text(writer, &hex_encode(v)),
        GffFieldValue::Vector3(v) => write_text(writer, &format!("{},{},{}", v[0], v[1], v[2])),
        GffFieldValue::Orientation(v) => write_text(writer, &format!("{},{},{},{}", v[0], v[1], v[2], v[3])),
        GffFieldValue::LocalizedString(locstring) => write_locstring(writer, locstring),
        GffFieldValue::Struct(_) | GffFieldValue::List(_) => unreachable!(),
    }

    writer.write_event(Event::End(BytesEnd::new("field"))).unwrap();
}

fn write_text<W: std::io::Write>(writer: &mut Writer<W>, text: &str) {
    writer.write_event(Event::Text(BytesText::new(text))).unwrap();
}

fn write_locstring<W: std::io::Write>(writer: &mut Writer<W>, locstring: &LocalizedString) {
    let mut start = BytesStart::new("locstring");
    start.push_attribute(("stringref", locstring.string_ref.to_string().as_str()));
    writer.write_event(Event::Start(start)).unwrap();
    for substring in &locstring.substrings {
        let mut entry = BytesStart::new("substring");
        entry.push_attribute(("language", substring.language_id.to_string().as_str()));
        writer.write_event(Event::Start(entry)).unwrap();
        write_text(writer, &substring.string);
        writer.write_event(Event::End(BytesEnd::new("substring"))).unwrap();
    }
    writer.write_event(Event::End(BytesEnd::new("locstring"))).unwrap();
}

fn hex_encode(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

fn hex_decode(text: &str) -> Result<Vec<u8>, Error> {
    if text.len() % 2 != 0 {
        return Err(Error::EncodingError(String::from("odd-length hex string")));
    }
    (0..text.len())
        .step_by(2)
        .map(|i| {
            u8::from_str_radix(&text[i..i + 2], 16)
                .map_err(|_| Error::EncodingError(String::from("invalid hex digit")))
        })
        .collect()
}

/// Parses the GFF XML bridge format back into an owned struct tree.
///
/// This is a small hand-rolled recursive-descent reader over `quick_xml`
/// events rather than a generic deserializer, since the schema is fixed
/// and shallow (struct/list/field, optionally nesting).
pub fn from_xml(xml: &str) -> Result<GffStruct, Error> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    loop {
        match reader
            .read_event()
            .map_err(|e| Error::StructuralError(format!("malformed XML: {e}")))?
        {
            Event::Start(tag) if tag.name().as_ref() == b"struct" => {
                return read_struct(&mut reader, &tag);
            }
            Event::Eof => return Err(Error::StructuralError(String::from("empty GFF XML document"))),
            _ => continue,
        }
    }
}

fn attr(tag: &BytesStart, name: &str) -> Option<String> {
    tag.attributes().flatten().find_map(|a| {
        if a.key.as_ref() == name.as_bytes() {
            Some(String::from_utf8_lossy(&a.value).to_string())
        } else {
            None
        }
    })
}

fn read_struct(reader: &mut Reader<&[u8]>, start: &BytesStart) -> Result<GffStruct, Error> {
    let struct_id: u32 = attr(start, "id")
        .ok_or_else(|| Error::StructuralError(String::from("<struct> missing id attribute")))?
        .parse()
        .map_err(|_| Error::StructuralError(String::from("<struct> id is not a number")))?;
    let mut result = GffStruct::new(struct_id);

    loop {
        match reader
            .read_event()
            .map_err(|e| Error::StructuralError(format!("malformed XML: {e}")))?
        {
            Event::Start(tag) if tag.name().as_ref() == b"field" => {
                let (label, value) = read_field(reader, &tag)?;
                result.set(&label, value);
            }
            Event::Start(tag) if tag.name().as_ref() == b"struct" => {
                let label = attr(&tag, "label")
                    .ok_or_else(|| Error::StructuralError(String::from("nested <struct> missing label")))?;
                let inner = read_struct(reader, &tag)?;
                result.set(&label, GffFieldValue::Struct(Box::new(inner)));
            }
            Event::Start(tag) if tag.name().as_ref() == b"list" => {
                let label = attr(&tag, "label")
                    .ok_or_else(|| Error::StructuralError(String::from("<list> missing label")))?;
                let list = read_list(reader)?;
                result.set(&label, GffFieldValue::List(list));
            }
            Event::End(tag) if tag.name().as_ref() == b"struct" => return Ok(result),
            Event::Eof => return Err(Error::StructuralError(String::from("unterminated <struct>"))),
            _ => continue,
        }
    }
}

fn read_list(reader: &mut Reader<&[u8]>) -> Result<GffList, Error> {
    let mut list = GffList::new();
    loop {
        match reader
            .read_event()
            .map_err(|e| Error::StructuralError(format!("malformed XML: {e}")))?
        {
            Event::Start(tag) if tag.name().as_ref() == b"struct" => {
                list.structs.push(read_struct(reader, &tag)?);
            }
            Event::End(tag) if tag.name().as_ref() == b"list" => return Ok(list),
            Event::Eof => return Err(Error::StructuralError(String::from("unterminated <list>"))),
            _ => continue,
        }
    }
}

fn read_field(reader: &mut Reader<&[u8]>, start: &BytesStart) -> Result<(String, GffFieldValue), Error> {
    let label = attr(start, "label").ok_or_else(|| Error::StructuralError(String::from("<field> missing label")))?;
    let field_type = attr(start, "type").ok_or_else(|| Error::StructuralError(String::from("<field> missing type")))?;

    if field_type == "locstring" {
        let locstring = read_locstring(reader)?;
        expect_field_end(reader)?;
        return Ok((label, GffFieldValue::LocalizedString(locstring)));
    }

    let mut text = String::new();
    loop {
        match reader
            .read_event()
            .map_err(|e| Error::StructuralError(format!("malformed XML: {e}")))?
        {
            Event::Text(bytes) => {
                text.push_str(&bytes.unescape().map_err(|e| Error::StructuralError(e.to_string()))?);
            }
            Event::End(tag) if tag.name().as_ref() == b"field" => break,
            Event::Eof => return Err(Error::StructuralError(String::from("unterminated <field>"))),
            _ => continue,
        }
    }

    let value = parse_scalar(&field_type, &text)?;
    Ok((label, value))
}

fn expect_field_end(reader: &mut Reader<&[u8]>) -> Result<(), Error> {
    loop {
        match reader
            .read_event()
            .map_err(|e| Error::StructuralError(format!("malformed XML: {e}")))?
        {
            Event::End(tag) if tag.name().as_ref() == b"field" => return Ok(()),
            Event::Eof => return Err(Error::StructuralError(String::from("unterminated <field>"))),
            _ => continue,
        }
    }
}

fn parse_scalar(field_type: &str, text: &str) -> Result<GffFieldValue, Error> {
    let parse_err = || Error::EncodingError(format!("invalid {field_type} value {text:?}"));
    Ok(match field_type {
        "uint8" => GffFieldValue::UInt8(text.parse().map_err(|_| parse_err())?),
        "int8" => GffFieldValue::Int8(text.parse().map_err(|_| parse_err())?),
        "uint16" => GffFieldValue::UInt16(text.parse().map_err(|_| parse_err())?),
        "int16" => GffFieldValue::Int16(text.parse().map_err(|_| parse_err())?),
        "uint32" => GffFieldValue::UInt32(text.parse().map_err(|_| parse_err())?),
        "int32" => GffFieldValue::Int32(text.parse().map_err(|_| parse_err())?),
        "uint64" => GffFieldValue::UInt64(text.parse().map_err(|_| parse_err())?),
        "int64" => GffFieldValue::Int64(text.parse().map_err(|_| parse_err())?),
        "single" => GffFieldValue::Single(text.parse().map_err(|_| parse_err())?),
        "double" => GffFieldValue::Double(text.parse().map_err(|_| parse_err())?),
        "exostring" => GffFieldValue::ExoString(text.to_string()),
        "resref" => GffFieldValue::ResRef(ResRef::from_reader_bytes(text)),
        "void" => GffFieldValue::Binary(hex_decode(text)?),
        "vector3" => {
            let parts: Vec<&str> = text.split(',').collect();
            if parts.len() != 3 {
                return Err(parse_err());
            }
            let mut v = [0f32; 3];
            for (i, part) in parts.iter().enumerate() {
                v[i] = part.parse().map_err(|_| parse_err())?;
            }
            GffFieldValue::Vector3(v)
        }
        "orientation" => {
            let parts: Vec<&str> = text.split(',').collect();
            if parts.len() != 4 {
                return Err(parse_err());
            }
            let mut v = [0f32; 4];
            for (i, part) in parts.iter().enumerate() {
                v[i] = part.parse().map_err(|_| parse_err())?;
            }
            GffFieldValue::Orientation(v)
        }
        other => return Err(Error::StructuralError(format!("unrecognized GFF XML field type {other:?}"))),
    })
}

fn read_locstring(reader: &mut Reader<&[u8]>) -> Result<LocalizedString, Error> {
    let mut string_ref = 0i32;
    let mut substrings = Vec::new();
    loop {
        match reader
            .read_event()
            .map_err(|e| Error::StructuralError(format!("malformed XML: {e}")))?
        {
            Event::Start(tag) if tag.name().as_ref() == b"locstring" => {
                string_ref = attr(&tag, "stringref")
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(0);
            }
            Event::Start(tag) if tag.name().as_ref() == b"substring" => {
                let language_id: u32 = attr(&tag, "language")
                    .ok_or_else(|| Error::StructuralError(String::from("<substring> missing language")))?
                    .parse()
                    .map_err(|_| Error::StructuralError(String::from("<substring> language is not a number")))?;
                let mut text = String::new();
                loop {
                    match reader
                        .read_event()
                        .map_err(|e| Error::StructuralError(format!("malformed XML: {e}")))?
                    {
                        Event::Text(bytes) => {
                            text.push_str(&bytes.unescape().map_err(|e| Error::StructuralError(e.to_string()))?);
                        }
                        Event::End(tag) if tag.name().as_ref() == b"substring" => break,
                        Event::Eof => return Err(Error::StructuralError(String::from("unterminated <substring>"))),
                        _ => continue,
                    }
                }
                substrings.push(LocalizedSubstring { language_id, string: text });
            }
            Event::End(tag) if tag.name().as_ref() == b"locstring" => {
                return Ok(LocalizedString { string_ref, substrings })
            }
            Event::Eof => return Err(Error::StructuralError(String::from("unterminated <locstring>"))),
            _ => continue,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_xml_round_trip_scalars() {
        let mut root = GffStruct::new(0xffff_ffff);
        root.set("HP", GffFieldValue::Int16(100));
        root.set("Tag", GffFieldValue::ExoString(String::from("P_BASTILA")));
        root.set("Position", GffFieldValue::Vector3([1.0, 2.0, 3.0]));

        let xml = to_xml(&root);
        let read_back = from_xml(&xml).unwrap();
        assert_eq!(read_back, root);
    }

    #[test]
    fn test_xml_round_trip_locstring_and_nesting() {
        let mut child = GffStruct::new(0);
        child.set(
            "Name",
            GffFieldValue::LocalizedString(LocalizedString {
                string_ref: -1,
                substrings: vec![LocalizedSubstring {
                    language_id: 0,
                    string: String::from("Bastila"),
                }],
            }),
        );
        let mut list = GffList::new();
        list.structs.push(child);

        let mut root = GffStruct::new(0xffff_ffff);
        root.set("Items", GffFieldValue::List(list));

        let xml = to_xml(&root);
        let read_back = from_xml(&xml).unwrap();
        assert_eq!(read_back, root);
    }

    #[test]
    fn test_xml_round_trip_binary() {
        let mut root = GffStruct::new(0);
        root.set("Blob", GffFieldValue::Binary(vec![0xde, 0xad, 0xbe, 0xef]));
        let xml = to_xml(&root);
        let read_back = from_xml(&xml).unwrap();
        assert_eq!(read_back, root);
    }
}
