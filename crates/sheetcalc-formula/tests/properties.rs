use std::cmp::Ordering;

use proptest::prelude::*;
use sheetcalc_core::{Locale, Scalar};
use sheetcalc_formula::operators::binary;
use sheetcalc_formula::BinaryOp;

fn number() -> impl Strategy<Value = Scalar> {
    (-1.0e12..1.0e12f64).prop_map(Scalar::Number)
}

fn text() -> impl Strategy<Value = Scalar> {
    "[a-zA-Z ]{0,12}".prop_map(Scalar::Text)
}

fn value() -> impl Strategy<Value = Scalar> {
    prop_oneof![number(), text(), any::<bool>().prop_map(Scalar::Logical)]
}

proptest! {
    #[test]
    fn test_logical_orders_above_text_and_numbers(b in any::<bool>(), other in prop_oneof![number(), text()]) {
        let locale = Locale::en_us();
        let logical = Scalar::Logical(b);
        prop_assert_eq!(logical.compare(&other, &locale), Ok(Ordering::Greater));
        prop_assert_eq!(
            binary(BinaryOp::Gt, &logical, &other, &locale),
            Scalar::Logical(true)
        );
    }

    #[test]
    fn test_text_orders_above_numbers(t in text(), n in number()) {
        let locale = Locale::en_us();
        prop_assert_eq!(
            binary(BinaryOp::Gt, &t, &n, &locale),
            Scalar::Logical(true)
        );
    }

    #[test]
    fn test_empty_text_is_concatenation_identity(x in value()) {
        let locale = Locale::en_us();
        let empty = Scalar::Text(String::new());
        let rendered = Scalar::Text(x.to_text(&locale).unwrap());

        prop_assert_eq!(binary(BinaryOp::Concat, &x, &empty, &locale), rendered.clone());
        prop_assert_eq!(binary(BinaryOp::Concat, &empty, &x, &locale), rendered);
    }

    #[test]
    fn test_comparison_is_antisymmetric(a in value(), b in value()) {
        let locale = Locale::en_us();
        let forward = a.compare(&b, &locale).unwrap();
        let backward = b.compare(&a, &locale).unwrap();
        prop_assert_eq!(forward, backward.reverse());
    }
}
