use corpus_forge::envelope::{DocumentBuilder, SourceKind};
use corpus_forge::markup::escape_markup;
use corpus_forge::normalize::{check_well_formed, clean_text, normalize};
use proptest::prelude::*;
use std::borrow::Cow;

proptest! {
    #[test]
    fn clean_text_is_idempotent(input in "\\PC{0,200}") {
        let once = clean_text(&input);
        prop_assert_eq!(clean_text(&once), once.clone());
    }

    #[test]
    fn clean_text_output_is_single_spaced_lowercase(input in "[ -~\\n\\t]{0,200}") {
        let out = clean_text(&input);
        prop_assert!(!out.contains("  "));
        prop_assert!(!out.contains('\n'));
        prop_assert_eq!(out.to_lowercase(), out.clone());
        prop_assert_eq!(out.trim(), out.as_str());
    }

    #[test]
    fn escaped_text_has_no_raw_markup(input in "\\PC{0,200}") {
        let escaped = escape_markup(&input);
        prop_assert!(!escaped.contains('<'));
        prop_assert!(!escaped.contains('>'));
        for (i, _) in escaped.match_indices('&') {
            let rest = &escaped[i..];
            prop_assert!(
                rest.starts_with("&amp;") || rest.starts_with("&lt;") || rest.starts_with("&gt;"),
                "bare ampersand in {:?}", escaped
            );
        }
    }

    #[test]
    fn plain_text_is_borrowed_unchanged(input in "[^&<>]{0,200}") {
        let escaped = escape_markup(&input);
        prop_assert!(matches!(escaped, Cow::Borrowed(_)));
        prop_assert_eq!(escaped.as_ref(), input.as_str());
    }

    #[test]
    fn built_documents_stay_structured(
        name in "[a-z]{1,8}(/[a-z]{1,8}){0,2}\\.py",
        content in "[ -~\\n]{0,300}",
    ) {
        let mut doc = DocumentBuilder::source(SourceKind::LocalDirectory, "./tree");
        doc.file(&name, &content);
        let raw = doc.finish();
        prop_assert!(check_well_formed(&raw).is_ok());

        let normalized = normalize(&raw);
        prop_assert!(normalized.is_structured());
        prop_assert!(check_well_formed(&normalized.text).is_ok());
    }
}
