use serde_json::json;

use crate::validate::Violation;
use crate::values::PropertyType;

/// Equality predicate over a property row.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterPredicate {
    Key(String),
    Type(PropertyType),
}

/// Parsed listing filter. `all` predicates must every one hold (AND), `any`
/// predicates admit a row when at least one holds (OR). Both groups apply
/// when both are present.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PropertyFilter {
    pub all: Vec<FilterPredicate>,
    pub any: Vec<FilterPredicate>,
}

impl PropertyFilter {
    pub fn is_empty(&self) -> bool {
        self.all.is_empty() && self.any.is_empty()
    }

    /// Builds a filter from raw query pairs. Repeated `where` params AND
    /// together; a `whereOr` param carries comma-separated alternatives.
    /// Query params other than `where`/`whereOr` are ignored.
    pub fn from_query(pairs: &[(String, String)]) -> Result<PropertyFilter, Vec<Violation>> {
        let mut filter = PropertyFilter::default();
        let mut violations = Vec::new();

        for (name, value) in pairs {
            match name.as_str() {
                "where" => match parse_predicate("#/where", value) {
                    Ok(pred) => filter.all.push(pred),
                    Err(v) => violations.push(v),
                },
                "whereOr" => {
                    for part in value.split(',') {
                        match parse_predicate("#/whereOr", part) {
                            Ok(pred) => filter.any.push(pred),
                            Err(v) => violations.push(v),
                        }
                    }
                }
                _ => {}
            }
        }

        if violations.is_empty() {
            Ok(filter)
        } else {
            Err(violations)
        }
    }
}

fn parse_predicate(context: &str, raw: &str) -> Result<FilterPredicate, Violation> {
    let (field, value) = raw.split_once('=').ok_or_else(|| {
        Violation::string(context, "pattern", json!("^(key|type)=.*$"), raw)
    })?;
    match field {
        "key" => Ok(FilterPredicate::Key(value.to_string())),
        "type" => PropertyType::parse(value)
            .map(FilterPredicate::Type)
            .ok_or_else(|| {
                Violation::string(
                    context,
                    "enum",
                    json!(["int", "double", "string", "json", "boolean"]),
                    value,
                )
            }),
        _ => Err(Violation::string(
            context,
            "enum",
            json!(["key", "type"]),
            field,
        )),
    }
}
