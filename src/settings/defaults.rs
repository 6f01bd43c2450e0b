//! Built-in settings catalogs.
//!
//! [`catalog()`] is the baseline every settings snapshot starts from.
//! [`test_catalog()`] is the source served under
//! [`TEST_SETTINGS_SOURCE`](crate::constants::TEST_SETTINGS_SOURCE) for
//! scoped test overrides.

use std::sync::LazyLock;

use serde_json::Value;

use super::catalog::Catalog;

static DEFAULTS: LazyLock<Catalog> = LazyLock::new(default_settings);
static TEST_SETTINGS: LazyLock<Catalog> = LazyLock::new(test_settings);

/// The default settings catalog.
pub fn catalog() -> &'static Catalog {
    &DEFAULTS
}

/// Settings served for the test source.
pub fn test_catalog() -> &'static Catalog {
    &TEST_SETTINGS
}

fn default_settings() -> Catalog {
    Catalog::new()
        // AWS
        .with("AWS_ACCESS_KEY_ID", Value::Null)
        .with("AWS_SECRET_ACCESS_KEY", Value::Null)
        .with("AWS_REGION", "us-west-2")
        // Local development against an SQS-compatible proxy
        .with("MESSAGE_QUEUE_USE_PROXY", false)
        .with("MESSAGE_QUEUE_PROXY_HOST", Value::Null)
        .with("MESSAGE_QUEUE_PROXY_PORT", Value::Null)
        .with("MESSAGE_QUEUE_ENDPOINT_URL", Value::Null)
        // Queues
        .with("QUEUE_PREFIX", "")
        .with("QUEUE_CONFIG", "taskworker.yaml")
        .with("QUEUE_CLASS", "kale.queue_info.TaskQueue")
        .with("QUEUE_SELECTOR", "kale.queue_selector.ReducedLottery")
        // Tasks
        .with("SQS_TASK_SIZE_LIMIT", 256_000)
        .with("DEFAULT_MAX_RETRIES", 4)
        .with("DEFAULT_RETRY_DELAY_SECS", 60)
        .with("TASK_TIMEOUT_SECS", 60)
        // Worker
        .with("SQS_MAX_TASKS_PER_FETCH", 10)
        .with("SQS_LONG_POLL_SECS", 20)
        .with("DIE_ON_RESOURCE_LIMIT", false)
        .with("DIE_ON_TIMEOUT_SECS", Value::Null)
        .with("RESOURCE_LIMIT_MB", 2048)
        .with("TIMESTAMP_FORMAT", "%Y-%m-%dT%H:%M:%S.%f")
        .with("PUBLISHER", "kale.publisher.Publisher")
}

fn test_settings() -> Catalog {
    Catalog::new()
        .with("AWS_REGION", "us-east-1")
        .with("MESSAGE_QUEUE_USE_PROXY", true)
        .with("MESSAGE_QUEUE_PROXY_HOST", "localhost")
        .with("MESSAGE_QUEUE_PROXY_PORT", 9324)
        .with("QUEUE_PREFIX", "test_")
        .with("QUEUE_CONFIG", "tests/test_queue_config.yaml")
        .with("TASK_TIMEOUT_SECS", 5)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn defaults_are_all_settings() {
        assert!(!catalog().is_empty());
        assert_eq!(catalog().settings().count(), catalog().len());
    }

    #[test]
    fn test_catalog_overrides_known_defaults() {
        for (key, _) in test_catalog().iter() {
            assert!(catalog().get(key).is_some(), "{key} has no default");
        }
    }

    #[test]
    fn defaults_are_stable() {
        assert!(std::ptr::eq(catalog(), catalog()));
        assert_eq!(catalog().get("AWS_REGION"), Some(&json!("us-west-2")));
    }
}
