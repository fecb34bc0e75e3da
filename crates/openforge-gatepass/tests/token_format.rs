use openforge_gatepass::{
    issue, parse, signing_material, verify, HmacSha256Signer, TokenError, DEFAULT_TOKEN_TTL_MS,
};
use proptest::prelude::*;

fn signer() -> HmacSha256Signer {
    HmacSha256Signer::new(b"vector-secret".to_vec())
}

#[test]
fn token_layout_is_three_colon_fields_with_hex_signature() {
    let token = issue(&signer(), "OF-2026-A7F3", 1_700_000_000_000);
    let mut fields = token.split(':');
    assert_eq!(fields.next(), Some("OF-2026-A7F3"));
    assert_eq!(fields.next(), Some("1700000000000"));
    let signature = fields.next().expect("signature field");
    assert_eq!(fields.next(), None);
    assert_eq!(signature.len(), 64);
    assert!(signature
        .bytes()
        .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b)));
    assert!(token.starts_with(&signing_material("OF-2026-A7F3", 1_700_000_000_000)));
}

proptest! {
    #[test]
    fn issue_parse_verify_round_trip(
        entity in "[A-Z]{2}-20[0-9]{2}-[0-9A-F]{4}",
        issued in 0u64..=4_102_444_800_000,
        skew in 0u64..=DEFAULT_TOKEN_TTL_MS,
    ) {
        let signer = signer();
        let token = issue(&signer, &entity, issued);

        let parts = parse(&token).expect("parse");
        prop_assert_eq!(parts.entity_id, entity.as_str());
        let issued_str = issued.to_string();
        prop_assert_eq!(parts.timestamp, issued_str.as_str());

        let verified = verify(&signer, &token, issued.saturating_add(skew), DEFAULT_TOKEN_TTL_MS)
            .expect("fresh token verifies");
        prop_assert_eq!(verified.entity_id.as_str(), entity.as_str());
        prop_assert_eq!(verified.issued_at_ms, issued);
    }

    #[test]
    fn entity_substitution_invalidates_signature(
        entity in "[A-Z]{2}-20[0-9]{2}-[0-9A-F]{4}",
        other in "[A-Z]{2}-20[0-9]{2}-[0-9A-F]{4}",
        issued in 0u64..=4_102_444_800_000,
    ) {
        prop_assume!(entity != other);
        let signer = signer();
        let token = issue(&signer, &entity, issued);
        let (_, rest) = token.split_once(':').expect("token has fields");
        let forged = format!("{other}:{rest}");
        prop_assert_eq!(
            verify(&signer, &forged, issued, DEFAULT_TOKEN_TTL_MS),
            Err(TokenError::InvalidSignature)
        );
    }

    #[test]
    fn truncated_signature_never_verifies(
        issued in 0u64..=4_102_444_800_000,
        cut in 1usize..64,
    ) {
        let signer = signer();
        let token = issue(&signer, "OF-2026-A7F3", issued);
        let truncated = &token[..token.len() - cut];
        prop_assert!(verify(&signer, truncated, issued, DEFAULT_TOKEN_TTL_MS).is_err());
    }
}
