use autoevals::{JsonDiff, ListContains, Scorer};
use proptest::prelude::*;
use serde_json::{Value, json};

fn block_on<F: std::future::Future>(future: F) -> F::Output {
    tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap().block_on(future)
}

fn list_score(output: &[String], expected: &[String]) -> f64 {
    block_on(ListContains::new().eval(json!(output), json!(expected))).unwrap().score.unwrap()
}

fn json_value() -> impl Strategy<Value = Value> {
    let leaf = prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::from),
        (-1000i64..1000).prop_map(Value::from),
        (-100.0f64..100.0).prop_map(Value::from),
        "[a-z ]{0,8}".prop_map(Value::from),
    ];
    leaf.prop_recursive(3, 24, 4, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..4).prop_map(Value::from),
            prop::collection::btree_map("[a-z]{1,4}", inner, 1..4)
                .prop_map(|m| Value::Object(m.into_iter().collect())),
        ]
    })
}

fn words() -> impl Strategy<Value = Vec<String>> {
    prop::collection::vec("[a-d]{0,4}", 0..5)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn list_contains_is_order_invariant(
        (output, shuffled) in words().prop_flat_map(|v| (Just(v.clone()), Just(v).prop_shuffle())),
        expected in words(),
    ) {
        let a = list_score(&output, &expected);
        let b = list_score(&shuffled, &expected);
        prop_assert!((a - b).abs() < 1e-9, "{} vs {}", a, b);
    }

    #[test]
    fn list_contains_is_symmetric(output in words(), expected in words()) {
        let a = list_score(&output, &expected);
        let b = list_score(&expected, &output);
        prop_assert!((a - b).abs() < 1e-9, "{} vs {}", a, b);
        prop_assert!((0.0..=1.0).contains(&a));
    }

    #[test]
    fn json_diff_is_idempotent(value in json_value()) {
        let score = block_on(JsonDiff::new().eval(value.clone(), value)).unwrap();
        prop_assert_eq!(score.score, Some(1.0));
    }
}

#[tokio::test]
async fn test_documented_values() {
    let diff = JsonDiff::new();
    let score = diff.eval(json!({"a": 1}), json!({"a": 2})).await.unwrap().score.unwrap();
    assert!((score - 2.0 / 3.0).abs() < 1e-9);
    assert_eq!(diff.eval(json!([]), json!([])).await.unwrap().score, Some(1.0));
    assert_eq!(diff.eval(json!([]), json!({})).await.unwrap().score, Some(0.0));

    let contains = ListContains::new();
    assert_eq!(contains.eval(json!(["a"]), json!(["a", "b"])).await.unwrap().score, Some(0.5));
    assert_eq!(contains.eval(json!(["a", "b"]), json!(["a"])).await.unwrap().score, Some(0.5));
    let extra = ListContains::new().with_allow_extra_entities(true);
    assert_eq!(extra.eval(json!(["a", "b"]), json!(["a"])).await.unwrap().score, Some(1.0));
}
