//! Azure naming rules
//!
//! Each check returns the tail of a message that reads after the field
//! name, e.g. "`name` may only contain ...".

use regex::Regex;
use std::sync::LazyLock;

type Check = Result<(), String>;

static LINKED_SERVICE_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_][^<>*#.%&:\\+?/]*$").expect("valid regex"));

static DATA_FACTORY_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9]+(?:-[A-Za-z0-9]+)*$").expect("valid regex"));

static IOTHUB_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9A-Za-z-]{1,50}$").expect("valid regex"));

static IOTHUB_ENDPOINT_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[-_.A-Za-z0-9]{1,64}$").expect("valid regex"));

/// Names IoT Hub keeps for its built-in endpoints
const RESERVED_ENDPOINT_NAMES: [&str; 4] = [
    "events",
    "operationsMonitoringEvents",
    "fileNotifications",
    "$default",
];

/// Linked service and dataset names
pub fn linked_service_name(value: &str) -> Check {
    if LINKED_SERVICE_NAME.is_match(value) {
        Ok(())
    } else {
        Err(format!(
            "must start with a letter, digit or '_' and must not contain any of <>*#.%&:\\+?/, found {:?}",
            value
        ))
    }
}

pub fn data_factory_name(value: &str) -> Check {
    if !(3..=63).contains(&value.len()) {
        return Err(format!(
            "must be between 3 and 63 characters long, found {:?}",
            value
        ));
    }
    if DATA_FACTORY_NAME.is_match(value) {
        Ok(())
    } else {
        Err(format!(
            "may only contain letters, digits and single inner hyphens, found {:?}",
            value
        ))
    }
}

pub fn iothub_name(value: &str) -> Check {
    if IOTHUB_NAME.is_match(value) {
        Ok(())
    } else {
        Err(format!(
            "must be 1 to 50 letters, digits or hyphens, found {:?}",
            value
        ))
    }
}

pub fn iothub_endpoint_name(value: &str) -> Check {
    if RESERVED_ENDPOINT_NAMES
        .iter()
        .any(|reserved| reserved.eq_ignore_ascii_case(value))
    {
        return Err(format!("{:?} is reserved by IoT Hub", value));
    }
    if IOTHUB_ENDPOINT_NAME.is_match(value) {
        Ok(())
    } else {
        Err(format!(
            "must be 1 to 64 letters, digits, '-', '_' or '.', found {:?}",
            value
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_linked_service_name() {
        for ok in ["linked1", "_private", "Cosmos Mongo", "a-b_c"] {
            assert!(linked_service_name(ok).is_ok(), "{:?}", ok);
        }
        for bad in ["", "a/b", "a.b", "-lead", "a?b", "a#b", "a%b", "a\\b", "a:b"] {
            assert!(linked_service_name(bad).is_err(), "{:?}", bad);
        }
    }

    #[test]
    fn test_data_factory_name() {
        for ok in ["abc", "my-factory-1", "ABC123"] {
            assert!(data_factory_name(ok).is_ok(), "{:?}", ok);
        }
        let long = "a".repeat(64);
        for bad in ["ab", "-abc", "abc-", "a--bc", "a_bc", "a/bc", long.as_str()] {
            assert!(data_factory_name(bad).is_err(), "{:?}", bad);
        }
    }

    #[test]
    fn test_iothub_name() {
        assert!(iothub_name("acctestIoTHub-1").is_ok());
        assert!(iothub_name("").is_err());
        assert!(iothub_name("hub.one").is_err());
        assert!(iothub_name(&"h".repeat(51)).is_err());
    }

    #[test]
    fn test_iothub_endpoint_name() {
        assert!(iothub_endpoint_name("acctest").is_ok());
        assert!(iothub_endpoint_name("archive.v2_x-1").is_ok());
        assert!(iothub_endpoint_name("a/b").is_err());
        assert!(iothub_endpoint_name("Events").is_err());
        assert!(iothub_endpoint_name("$default").is_err());
    }
}
