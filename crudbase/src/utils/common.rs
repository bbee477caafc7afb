use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

/// Unwrap an optional list, treating `None` as empty.
pub fn get_valid_array<T>(array: Option<Vec<T>>) -> Vec<T> {
    array.unwrap_or_default()
}

pub fn is_empty_array<T>(array: Option<&[T]>) -> bool {
    array.is_none_or(|a| a.is_empty())
}

/// Copy only the given keys. Keys missing from `object` are left out.
pub fn pick_by(object: Option<&Map<String, Value>>, keys: &[&str]) -> Map<String, Value> {
    let Some(object) = object else {
        return Map::new();
    };

    keys.iter()
        .filter_map(|key| object.get(*key).map(|v| (key.to_string(), v.clone())))
        .collect()
}

/// Copy of `object` without the given keys.
pub fn trim_keys(object: &Map<String, Value>, keys: &[&str]) -> Map<String, Value> {
    let mut result = object.clone();
    for key in keys {
        result.remove(*key);
    }
    result
}

/// Whether two half-open time ranges `[start, end)` overlap.
pub fn check_overlap_time(
    range1: (DateTime<Utc>, DateTime<Utc>),
    range2: (DateTime<Utc>, DateTime<Utc>),
) -> bool {
    let (start1, end1) = range1;
    let (start2, end2) = range2;
    start1 < end2 && start2 < end1
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn at(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, hour, 0, 0).unwrap()
    }

    #[test]
    fn test_arrays() {
        assert_eq!(get_valid_array::<i32>(None), Vec::<i32>::new());
        assert_eq!(get_valid_array(Some(vec![1, 2])), vec![1, 2]);
        assert!(is_empty_array::<i32>(None));
        assert!(is_empty_array::<i32>(Some(&[])));
        assert!(!is_empty_array(Some(&[1])));
    }

    #[test]
    fn test_pick_and_trim_keys() {
        let object = json!({ "a": 1, "b": 2, "c": 3 });
        let object = object.as_object().unwrap();

        assert_eq!(Value::Object(pick_by(Some(object), &["a", "c", "z"])), json!({ "a": 1, "c": 3 }));
        assert!(pick_by(None, &["a"]).is_empty());
        assert_eq!(Value::Object(trim_keys(object, &["b"])), json!({ "a": 1, "c": 3 }));
    }

    #[test]
    fn test_overlap() {
        assert!(check_overlap_time((at(9), at(11)), (at(10), at(12))));
        assert!(check_overlap_time((at(9), at(12)), (at(10), at(11))));
        // Touching ranges do not overlap
        assert!(!check_overlap_time((at(9), at(10)), (at(10), at(11))));
        assert!(!check_overlap_time((at(13), at(14)), (at(9), at(10))));
    }
}
