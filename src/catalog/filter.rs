//! Filter predicates over catalog records.

use serde::{Deserialize, Serialize};

use crate::models::ProjectRecord;

/// Optional predicates narrowing the catalog before scoring.
///
/// Every present field must hold (logical AND). String fields are
/// case-insensitive substring matches; blank strings are ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterSpec {
    #[serde(default)]
    pub category: Option<String>,

    #[serde(default, rename = "type")]
    pub project_type: Option<String>,

    #[serde(default)]
    pub supervisor: Option<String>,

    /// Keep only joint or URECA projects when true
    #[serde(default, alias = "joint")]
    pub joint_or_ureca: bool,
}

impl FilterSpec {
    /// Fill fields that are unset or blank here from `other`.
    pub fn or(self, other: FilterSpec) -> FilterSpec {
        FilterSpec {
            category: present_or(self.category, other.category),
            project_type: present_or(self.project_type, other.project_type),
            supervisor: present_or(self.supervisor, other.supervisor),
            joint_or_ureca: self.joint_or_ureca || other.joint_or_ureca,
        }
    }
}

fn present_or(own: Option<String>, other: Option<String>) -> Option<String> {
    if needle(&own).is_some() {
        own
    } else {
        other
    }
}

/// Lowercased needle, or None when the filter is absent or blank.
fn needle(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_lowercase)
}

fn contains_ci(haystack: &str, needle: &Option<String>) -> bool {
    match needle {
        Some(n) => haystack.to_lowercase().contains(n.as_str()),
        None => true,
    }
}

/// Keep the records that satisfy every predicate in `filters`.
///
/// Input order is preserved. The function is pure and idempotent, and the
/// predicates are independent, so the order in which they are checked does not
/// affect the result.
pub fn apply_filters<'a, I>(records: I, filters: &FilterSpec) -> Vec<&'a ProjectRecord>
where
    I: IntoIterator<Item = &'a ProjectRecord>,
{
    let category = needle(&filters.category);
    let project_type = needle(&filters.project_type);
    let supervisor = needle(&filters.supervisor);

    records
        .into_iter()
        .filter(|p| contains_ci(&p.category, &category))
        .filter(|p| contains_ci(&p.project_type, &project_type))
        .filter(|p| contains_ci(&p.supervisor, &supervisor))
        .filter(|p| !filters.joint_or_ureca || p.is_joint())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    fn project(no: &str, category: &str, project_type: &str, supervisor: &str, joint: &str) -> ProjectRecord {
        serde_json::from_value(json!({
            "projectNo": no,
            "category": category,
            "type": project_type,
            "supervisor": supervisor,
            "isJointOrURECA": joint,
        }))
        .unwrap()
    }

    fn sample() -> Vec<ProjectRecord> {
        vec![
            project("P-1", "Software Only", "Research & Development", "Prof Dusit Niyato", "No"),
            project("P-2", "Hardware & Software", "Design & Implementation", "Ast/P Wang Yong", "Yes"),
            project("P-3", "Software Only", "Design & Implementation", "Ast/P Wang Yong", "URECA"),
            project("P-4", "Research Only", "Research & Development", "Dr Lee", "No"),
        ]
    }

    fn ids(records: &[&ProjectRecord]) -> Vec<String> {
        records.iter().map(|p| p.project_no.clone()).collect()
    }

    #[test]
    fn test_empty_filter_keeps_everything_in_order() {
        let records = sample();
        let kept = apply_filters(&records, &FilterSpec::default());
        assert_eq!(ids(&kept), vec!["P-1", "P-2", "P-3", "P-4"]);
    }

    #[test]
    fn test_category_is_case_insensitive_substring() {
        let records = sample();
        let filters = FilterSpec {
            category: Some("SOFTWARE only".to_string()),
            ..Default::default()
        };
        assert_eq!(ids(&apply_filters(&records, &filters)), vec!["P-1", "P-3"]);
    }

    #[test]
    fn test_filters_compose_as_and() {
        let records = sample();
        let filters = FilterSpec {
            project_type: Some("design".to_string()),
            supervisor: Some("wang".to_string()),
            ..Default::default()
        };
        assert_eq!(ids(&apply_filters(&records, &filters)), vec!["P-2", "P-3"]);

        let filters = FilterSpec {
            category: Some("software only".to_string()),
            supervisor: Some("wang".to_string()),
            ..Default::default()
        };
        assert_eq!(ids(&apply_filters(&records, &filters)), vec!["P-3"]);
    }

    #[test]
    fn test_joint_filter_keeps_anything_but_no() {
        let records = sample();
        let filters = FilterSpec {
            joint_or_ureca: true,
            ..Default::default()
        };
        assert_eq!(ids(&apply_filters(&records, &filters)), vec!["P-2", "P-3"]);
    }

    #[test]
    fn test_blank_filter_values_are_ignored() {
        let records = sample();
        let filters = FilterSpec {
            category: Some("   ".to_string()),
            supervisor: Some(String::new()),
            ..Default::default()
        };
        assert_eq!(apply_filters(&records, &filters).len(), 4);
    }

    #[test]
    fn test_or_prefers_own_fields() {
        let flat = FilterSpec {
            category: Some("Software".to_string()),
            ..Default::default()
        };
        let nested = FilterSpec {
            category: Some("Hardware".to_string()),
            supervisor: Some("Wang".to_string()),
            joint_or_ureca: true,
            ..Default::default()
        };
        let merged = flat.or(nested);
        assert_eq!(merged.category.as_deref(), Some("Software"));
        assert_eq!(merged.supervisor.as_deref(), Some("Wang"));
        assert!(merged.joint_or_ureca);
    }

    #[test]
    fn test_or_skips_blank_own_fields() {
        let flat = FilterSpec {
            category: Some(String::new()),
            supervisor: Some("   ".to_string()),
            ..Default::default()
        };
        let nested = FilterSpec {
            category: Some("Hardware".to_string()),
            supervisor: Some("Wang".to_string()),
            ..Default::default()
        };
        let merged = flat.or(nested);
        assert_eq!(merged.category.as_deref(), Some("Hardware"));
        assert_eq!(merged.supervisor.as_deref(), Some("Wang"));
        assert_eq!(ids(&apply_filters(&sample(), &merged)), vec!["P-2"]);
    }

    #[test]
    fn test_deserializes_wire_names() {
        let filters: FilterSpec =
            serde_json::from_value(json!({"type": "Research", "joint": true})).unwrap();
        assert_eq!(filters.project_type.as_deref(), Some("Research"));
        assert!(filters.joint_or_ureca);
    }

    fn arb_field() -> impl Strategy<Value = String> {
        prop::sample::select(vec!["Software Only", "software", "Hardware", "Research", "", "Wang"])
            .prop_map(str::to_string)
    }

    fn arb_record() -> impl Strategy<Value = ProjectRecord> {
        (any::<u16>(), arb_field(), arb_field(), arb_field(), prop::bool::ANY).prop_map(
            |(n, category, project_type, supervisor, joint)| {
                project(
                    &format!("P-{}", n),
                    &category,
                    &project_type,
                    &supervisor,
                    if joint { "Yes" } else { "No" },
                )
            },
        )
    }

    fn arb_filters() -> impl Strategy<Value = FilterSpec> {
        (
            prop::option::of(arb_field()),
            prop::option::of(arb_field()),
            prop::option::of(arb_field()),
            prop::bool::ANY,
        )
            .prop_map(|(category, project_type, supervisor, joint_or_ureca)| FilterSpec {
                category,
                project_type,
                supervisor,
                joint_or_ureca,
            })
    }

    proptest! {
        #[test]
        fn prop_filtering_is_idempotent(
            records in prop::collection::vec(arb_record(), 0..30),
            filters in arb_filters(),
        ) {
            let once = apply_filters(&records, &filters);
            let twice = apply_filters(once.iter().copied(), &filters);
            prop_assert_eq!(ids(&once), ids(&twice));
        }

        #[test]
        fn prop_predicates_commute(
            records in prop::collection::vec(arb_record(), 0..30),
            filters in arb_filters(),
        ) {
            let category_only = FilterSpec { category: filters.category.clone(), ..Default::default() };
            let rest = FilterSpec { category: None, ..filters.clone() };

            let a = apply_filters(apply_filters(&records, &category_only), &rest);
            let b = apply_filters(apply_filters(&records, &rest), &category_only);
            prop_assert_eq!(ids(&a), ids(&apply_filters(&records, &filters)));
            prop_assert_eq!(ids(&a), ids(&b));
        }
    }
}
