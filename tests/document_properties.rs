//! Property-based tests for the policy document codec
//!
//! Uses proptest to verify round-trip and append invariants across random documents

use iam_ip_allowlist::{Condition, NotIpAddress, PolicyDocument, Statement};
use percent_encoding::{utf8_percent_encode, NON_ALPHANUMERIC};
use proptest::prelude::*;

fn arb_ip() -> impl Strategy<Value = String> {
    (any::<[u8; 4]>(), prop::option::of(0u8..=32)).prop_map(|(octets, prefix)| {
        let ip = format!("{}.{}.{}.{}", octets[0], octets[1], octets[2], octets[3]);
        match prefix {
            Some(bits) => format!("{}/{}", ip, bits),
            None => ip,
        }
    })
}

fn arb_statement() -> impl Strategy<Value = Statement> {
    (
        "[A-Za-z0-9]{0,16}",
        prop_oneof![Just("Allow".to_string()), Just("Deny".to_string())],
        "[a-z0-9:*]{1,24}",
        "[\\PC]{1,32}",
        prop::collection::vec(arb_ip(), 0..8),
    )
        .prop_map(|(sid, effect, action, resource, ips)| Statement {
            sid,
            effect,
            action,
            resource,
            condition: Condition {
                not_ip_address: NotIpAddress { source_ip: ips },
            },
        })
}

fn arb_document() -> impl Strategy<Value = PolicyDocument> {
    prop::collection::vec(arb_statement(), 1..4).prop_map(|statement| PolicyDocument {
        version: "2012-10-17".to_string(),
        statement,
    })
}

fn arb_single_statement_document() -> impl Strategy<Value = PolicyDocument> {
    arb_statement().prop_map(|statement| PolicyDocument {
        version: "2012-10-17".to_string(),
        statement: vec![statement],
    })
}

proptest! {
    #[test]
    fn prop_encode_then_from_json_is_identity(document in arb_document()) {
        let encoded = document.encode().unwrap();
        let decoded = PolicyDocument::from_json(&encoded).unwrap();
        prop_assert_eq!(decoded, document);
    }

    #[test]
    fn prop_url_encoded_decode_is_identity(document in arb_document()) {
        // Identity service returns the encoded text URL-encoded
        let encoded = document.encode().unwrap();
        let wire = utf8_percent_encode(&encoded, NON_ALPHANUMERIC).to_string();
        let decoded = PolicyDocument::decode(&wire).unwrap();
        prop_assert_eq!(decoded, document);
    }

    #[test]
    fn prop_add_source_ip_appends_last(
        document in arb_single_statement_document(),
        ip in arb_ip()
    ) {
        let original = document.source_ips().unwrap().to_vec();

        let mut mutated = document.clone();
        mutated.add_source_ip(ip.clone()).unwrap();
        let ips = mutated.source_ips().unwrap();

        prop_assert_eq!(ips.len(), original.len() + 1);
        prop_assert_eq!(&ips[..original.len()], original.as_slice());
        prop_assert_eq!(&ips[original.len()], &ip);

        // Everything except the allowlist is untouched
        let mut restored = mutated.clone();
        restored.statement[0].condition.not_ip_address.source_ip.pop();
        prop_assert_eq!(restored, document);
    }
}
