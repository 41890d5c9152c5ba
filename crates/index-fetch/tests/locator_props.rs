use index_fetch::{LocatorErrorKind, ObjectLocator};
use proptest::prelude::*;

fn bucket() -> impl Strategy<Value = String> {
    "[a-z0-9][a-z0-9.-]{1,40}[a-z0-9]"
}

fn key() -> impl Strategy<Value = String> {
    (
        prop::collection::vec("[a-zA-Z0-9_ ?#%+=~.é日-]{1,12}", 1..5)
            .prop_filter("dot segments are resolved by URL rules", |segments| {
                segments.iter().all(|segment| segment != "." && segment != "..")
            }),
        any::<bool>(),
    )
        .prop_map(|(segments, trailing_slash)| {
            let mut key = segments.join("/");
            if trailing_slash {
                key.push('/');
            }
            key
        })
}

proptest! {
    #[test]
    fn display_then_parse_round_trips(bucket in bucket(), key in key()) {
        let locator = ObjectLocator::new(bucket.clone(), key.clone()).unwrap();
        let reparsed = ObjectLocator::parse(&locator.to_string()).unwrap();
        prop_assert_eq!(reparsed.container(), bucket.as_str());
        prop_assert_eq!(reparsed.key(), key.as_str());
        prop_assert_eq!(reparsed, locator);
    }

    #[test]
    fn plain_keys_parse_verbatim(
        bucket in bucket(),
        key in "[a-zA-Z0-9_.-]{1,20}(/[a-zA-Z0-9_-]{1,20}){0,3}/?"
    ) {
        let first_segment = key.split('/').next().unwrap_or_default();
        prop_assume!(first_segment != "." && first_segment != "..");
        let raw = format!("s3://{bucket}/{key}");
        let locator = ObjectLocator::parse(&raw).unwrap();
        prop_assert_eq!(locator.container(), bucket.as_str());
        prop_assert_eq!(locator.key(), key.as_str());
        prop_assert_eq!(locator.to_string(), raw);
    }

    #[test]
    fn bucket_only_locators_are_rejected(bucket in bucket(), slash in any::<bool>()) {
        let raw = if slash { format!("s3://{bucket}/") } else { format!("s3://{bucket}") };
        let err = ObjectLocator::parse(&raw).unwrap_err();
        prop_assert_eq!(err.kind(), &LocatorErrorKind::MissingKey);
        prop_assert_eq!(err.locator(), raw.as_str());
    }

    #[test]
    fn scheme_less_input_is_rejected(bucket in bucket(), key in key()) {
        let raw = format!("{bucket}/{key}");
        prop_assert!(ObjectLocator::parse(&raw).is_err());
    }
}
