use bintag_core::analysis::rank::{
    rank_candidates, render_candidates, RankedCandidate, DEFAULT_DISPLAY_THRESHOLD,
    IMPORTS_MATCH_ANNOTATION,
};

fn candidate(tag: &str, distance: f64) -> RankedCandidate {
    RankedCandidate {
        tag: tag.to_string(),
        distance,
        description: String::new(),
        imports: Vec::new(),
    }
}

#[test]
fn ranks_ascending_and_drops_entries_at_or_above_threshold() {
    let input =
        vec![candidate("a", 7.2), candidate("b", 3.1), candidate("c", 4.9), candidate("d", 1.0)];
    let ranked = rank_candidates(input, DEFAULT_DISPLAY_THRESHOLD);
    let distances: Vec<f64> = ranked.iter().map(|c| c.distance).collect();
    assert_eq!(distances, vec![1.0, 3.1, 4.9]);

    let at_threshold = rank_candidates(vec![candidate("edge", 5.0)], DEFAULT_DISPLAY_THRESHOLD);
    assert!(at_threshold.is_empty());
}

#[test]
fn ties_keep_input_order() {
    let input = vec![candidate("first", 2.0), candidate("zero", 0.0), candidate("second", 2.0)];
    let names: Vec<String> = rank_candidates(input, 5.0).into_iter().map(|c| c.tag).collect();
    assert_eq!(names, vec!["zero", "first", "second"]);
}

#[test]
fn infinite_distances_are_never_shown() {
    let ranked = rank_candidates(vec![candidate("empty", f64::INFINITY)], f64::MAX);
    assert!(ranked.is_empty());
}

#[test]
fn render_emits_name_annotation_description_and_separator() {
    let mut matching = candidate("openssl", 0.5);
    matching.description = "OpenSSL 1.1.1\nbuilt with -O2".into();
    matching.imports = vec!["b".into(), "a".into()];
    let mut other = candidate("zlib", 1.25);
    other.description = "zlib".into();
    other.imports = vec!["a".into()];

    let current = vec!["a".to_string(), "b".to_string()];
    let lines = render_candidates(&[matching, other], &current);
    assert_eq!(
        lines,
        vec![
            "openssl (0.5000)",
            IMPORTS_MATCH_ANNOTATION,
            "OpenSSL 1.1.1",
            "built with -O2",
            "",
            "zlib (1.2500)",
            "zlib",
            "",
        ]
    );
}

#[test]
fn render_of_nothing_is_empty() {
    assert!(render_candidates(&[], &[]).is_empty());
}
