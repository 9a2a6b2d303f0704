//! Engine-compatibility validation against the limits reverse-engineered
//! from `CResGFF` in the BioWare engine: struct depth, struct/field counts,
//! label uniqueness and width. A pure read-only traversal; never repairs.

use kotor_common::error::Error;

use super::field::{GffFieldValue, GffStruct};

const MAX_STRUCT_DEPTH: usize = 10;
const MAX_STRUCTS: usize = 10_000;
const MAX_FIELDS: usize = 50_000;
const MAX_FIELDS_PER_STRUCT: usize = 1_000;
const MAX_LABEL_BYTES: usize = 16;

pub fn validate(root: &GffStruct) -> Result<(), Error> {
    let mut issues = Vec::new();

    let depth = max_depth(root);
    if depth > MAX_STRUCT_DEPTH {
        issues.push(format!("struct hierarchy is too deep (depth {depth})"));
    }

    let mut total_structs = 0usize;
    let mut total_fields = 0usize;
    walk(root, &mut |s| {
        total_structs += 1;
        total_fields += s.len();

        if s.len() > MAX_FIELDS_PER_STRUCT {
            issues.push(format!(
                "struct {} has too many fields ({})",
                s.struct_id,
                s.len()
            ));
        }

        let mut seen_labels = std::collections::HashSet::new();
        for field in s {
            if field.label.trim().is_empty() {
                issues.push(format!("struct {} has a field with an empty label", s.struct_id));
            }
            if field.label.len() > MAX_LABEL_BYTES {
                issues.push(format!(
                    "label {:?} exceeds {MAX_LABEL_BYTES}-byte engine limit",
                    field.label
                ));
            }
            if field.label.as_bytes().contains(&0) {
                issues.push(format!("label {:?} contains a NUL byte", field.label));
            }
            if !seen_labels.insert(field.label.clone()) {
                issues.push(format!("duplicate field label {:?}", field.label));
            }
        }
    });

    if total_structs > MAX_STRUCTS {
        issues.push(format!("GFF has unusually many structs ({total_structs})"));
    }
    if total_fields > MAX_FIELDS {
        issues.push(format!("GFF has unusually many fields ({total_fields})"));
    }

    if issues.is_empty() {
        Ok(())
    } else {
        Err(Error::ValidationError(issues.join("; ")))
    }
}

fn max_depth(s: &GffStruct) -> usize {
    let mut max_child_depth = 0;
    for field in s {
        match &field.value {
            GffFieldValue::Struct(inner) => {
                max_child_depth = max_child_depth.max(max_depth(inner));
            }
            GffFieldValue::List(list) => {
                for child in &list.structs {
                    max_child_depth = max_child_depth.max(max_depth(child));
                }
            }
            _ => {}
        }
    }
    max_child_depth + 1
}

fn walk<'a>(s: &'a GffStruct, visit: &mut impl FnMut(&'a GffStruct)) {
    visit(s);
    for field in s {
        match &field.value {
            GffFieldValue::Struct(inner) => walk(inner, visit),
            GffFieldValue::List(list) => {
                for child in &list.structs {
                    walk(child, visit);
                }
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_struct_passes() {
        let mut root = GffStruct::new(0xffff_ffff);
        root.set("HP", GffFieldValue::Int16(100));
        assert!(validate(&root).is_ok());
    }

    #[test]
    fn test_excessive_depth_is_flagged() {
        fn nest(depth: usize) -> GffStruct {
            let mut s = GffStruct::new(0);
            if depth > 0 {
                s.set("Child", GffFieldValue::Struct(Box::new(nest(depth - 1))));
            }
            s
        }
        let root = nest(MAX_STRUCT_DEPTH + 2);
        let result = validate(&root);
        assert!(matches!(result, Err(Error::ValidationError(_))));
    }

    #[test]
    fn test_overlong_label_is_flagged() {
        let mut root = GffStruct::new(0);
        root.set("ThisLabelIsWayTooLongForTheEngine", GffFieldValue::UInt8(1));
        let result = validate(&root);
        assert!(matches!(result, Err(Error::ValidationError(_))));
    }

    #[test]
    fn test_too_many_fields_in_struct_is_flagged() {
        let mut root = GffStruct::new(0);
        for i in 0..(MAX_FIELDS_PER_STRUCT + 1) {
            root.set(&format!("F{i}"), GffFieldValue::UInt8(0));
        }
        let result = validate(&root);
        assert!(matches!(result, Err(Error::ValidationError(_))));
    }
}
