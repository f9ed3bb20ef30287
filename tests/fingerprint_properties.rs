use kogin_lib::{
    compute_fingerprint, fingerprint_json, BoundingBox, DigestAlgorithm, Fingerprint,
    FingerprintConfig, FingerprintError, PatternNode,
};

fn fingerprint(layers: &[PatternNode], bbox: BoundingBox) -> Fingerprint {
    compute_fingerprint(layers, bbox, &FingerprintConfig::default())
        .expect("fingerprint should compute")
}

fn bbox() -> BoundingBox {
    BoundingBox::new(0, 0, 40, 20)
}

fn single_layer(children: Vec<PatternNode>) -> Vec<PatternNode> {
    vec![PatternNode::layer("Layer 1", children)]
}

fn sample_pattern() -> Vec<PatternNode> {
    vec![
        PatternNode::layer(
            "Layer 1",
            vec![
                PatternNode::leaf("3-000000", &[(0, 0), (6, 0), (2, 1)]),
                PatternNode::leaf("5-000000", &[(10, 2), (1, 3)]),
                PatternNode::group(
                    4,
                    4,
                    vec![
                        PatternNode::leaf("1-ff0000", &[(0, 0), (3, 0)]),
                        PatternNode::leaf("7-ff0000", &[(1, 1)]),
                    ],
                ),
            ],
        ),
        PatternNode::layer(
            "Layer 2",
            vec![
                PatternNode::leaf("3-0000ff", &[(0, 0), (14, 0)]),
                PatternNode::leaf("2-0000ff", &[(11, 2)]),
            ],
        ),
    ]
}

fn reordered(nodes: &[PatternNode], rotate: usize) -> Vec<PatternNode> {
    let mut nodes: Vec<PatternNode> = nodes
        .iter()
        .map(|node| match node {
            PatternNode::Leaf { reference, coords } => {
                let mut coords = coords.clone();
                coords.reverse();
                PatternNode::Leaf {
                    reference: reference.clone(),
                    coords,
                }
            }
            PatternNode::Group {
                x,
                y,
                children,
                layer,
                name,
                visible,
            } => PatternNode::Group {
                x: *x,
                y: *y,
                children: reordered(children, rotate + 1),
                layer: *layer,
                name: name.clone(),
                visible: *visible,
            },
        })
        .collect();
    nodes.reverse();
    if !nodes.is_empty() {
        let shift = rotate % nodes.len();
        nodes.rotate_left(shift);
    }
    nodes
}

#[test]
fn sibling_order_does_not_change_digest() {
    let pattern = sample_pattern();
    let expected = fingerprint(&pattern, bbox());

    for rotate in 0..4 {
        let shuffled = reordered(&pattern, rotate);
        assert_eq!(fingerprint(&shuffled, bbox()).digest, expected.digest);
    }
}

#[test]
fn exact_duplicate_placement_is_ignored() {
    let base = single_layer(vec![PatternNode::leaf("4-000000", &[(2, 3), (9, 3)])]);
    let duplicated = single_layer(vec![
        PatternNode::leaf("4-000000", &[(2, 3), (9, 3)]),
        PatternNode::leaf("4-ff0000", &[(2, 3)]),
    ]);
    assert_eq!(
        fingerprint(&base, bbox()).digest,
        fingerprint(&duplicated, bbox()).digest
    );
}

#[test]
fn contained_stitch_is_absorbed() {
    let base = single_layer(vec![PatternNode::leaf("6-000000", &[(0, 2)])]);
    let with_inner = single_layer(vec![
        PatternNode::leaf("6-000000", &[(0, 2)]),
        PatternNode::leaf("3-000000", &[(2, 2)]),
    ]);
    let result = fingerprint(&with_inner, bbox());
    assert_eq!(fingerprint(&base, bbox()).digest, result.digest);
    assert_eq!(result.stats.contained_removed, 1);
}

#[test]
fn overlapping_pair_matches_merged_stitch() {
    let overlapping = single_layer(vec![
        PatternNode::leaf("5-000000", &[(0, 0)]),
        PatternNode::leaf("6-000000", &[(3, 0)]),
    ]);
    let merged = single_layer(vec![PatternNode::leaf("9-000000", &[(0, 0)])]);

    let result = fingerprint(&overlapping, bbox());
    assert_eq!(result.canonical, "9:0,0");
    assert_eq!(result.digest, fingerprint(&merged, bbox()).digest);
}

#[test]
fn chained_overlaps_merge_into_one_stitch() {
    let chained = single_layer(vec![PatternNode::leaf(
        "4-000000",
        &[(6, 0), (0, 0), (3, 0)],
    )]);
    let result = fingerprint(&chained, bbox());
    assert_eq!(result.canonical, "10:0,0");
    assert_eq!(result.stats.overlap_groups, 1);
    assert_eq!(result.stats.overlap_stitches_merged, 3);
}

#[test]
fn translation_with_bounding_box_is_invariant() {
    let pattern = sample_pattern();
    let expected = fingerprint(&pattern, bbox()).digest;

    let shifted = vec![PatternNode::group(7, -3, pattern)];
    let moved_bbox = bbox().translated(7, -3);
    assert_eq!(fingerprint(&shifted, moved_bbox).digest, expected);
}

#[test]
fn disjoint_stitches_both_survive_in_start_order() {
    let pattern = single_layer(vec![PatternNode::leaf("3-000000", &[(5, 0), (0, 0)])]);
    let result = fingerprint(&pattern, bbox());
    assert_eq!(result.canonical, "3:0,0;5,0");
    assert_eq!(result.stats.overlap_groups, 0);
    assert_eq!(result.stitch_count, 2);
}

#[test]
fn shorter_stitch_inside_longer_one_is_detected() {
    let pattern = single_layer(vec![
        PatternNode::leaf("2-000000", &[(1, 0)]),
        PatternNode::leaf("5-000000", &[(0, 0)]),
    ]);
    let result = fingerprint(&pattern, bbox());
    assert_eq!(result.canonical, "5:0,0");
}

#[test]
fn repeated_runs_are_byte_identical() {
    let pattern = sample_pattern();
    let first = fingerprint(&pattern, bbox());
    let second = fingerprint(&pattern, bbox());
    assert_eq!(first, second);
}

#[test]
fn sha256_config_changes_digest_width_only() {
    let pattern = sample_pattern();
    let legacy = fingerprint(&pattern, bbox());
    let config = FingerprintConfig {
        digest: DigestAlgorithm::Sha256,
        ..FingerprintConfig::default()
    };
    let wide = compute_fingerprint(&pattern, bbox(), &config).expect("fingerprint");
    assert_eq!(legacy.digest.len(), 40);
    assert_eq!(wide.digest.len(), 64);
    assert_eq!(legacy.canonical, wide.canonical);
}

#[test]
fn embedded_json_is_fingerprinted_end_to_end() {
    let raw = r##"{
        "application": "kogin",
        "bbox": [10, 5, 12, 3],
        "defs": {"single": [{"length": "3", "colors": ["#000000"]}]},
        "pivots": [],
        "data": [
            {"layer": true, "name": "Layer 1", "children": [
                {"ref": "3-000000", "coords": [[10, 5], [12, 5], [20, 7]]}
            ]}
        ]
    }"##;

    let result = fingerprint_json(raw, &FingerprintConfig::default()).expect("fingerprint");
    assert_eq!(result.canonical, "3:10,2\n5:0,0");
    assert_eq!(result.digest.len(), 40);
}

#[test]
fn malformed_reference_fails_the_whole_computation() {
    let pattern = single_layer(vec![
        PatternNode::leaf("3-000000", &[(0, 0)]),
        PatternNode::leaf("long-000000", &[(4, 0)]),
    ]);
    let err = compute_fingerprint(&pattern, bbox(), &FingerprintConfig::default())
        .expect_err("bad reference should fail");
    assert!(matches!(err, FingerprintError::InvalidReference { .. }));
}

#[test]
fn separate_overlap_groups_on_one_row_merge_independently() {
    let pattern = single_layer(vec![
        PatternNode::leaf("4-000000", &[(0, 0), (3, 0)]),
        PatternNode::leaf("3-000000", &[(10, 0)]),
        PatternNode::leaf("4-ff0000", &[(12, 0)]),
        PatternNode::leaf("2-000000", &[(20, 0)]),
    ]);
    let result = fingerprint(&pattern, bbox());
    assert_eq!(result.canonical, "2:20,0\n6:10,0\n7:0,0");
    assert_eq!(result.stats.overlap_groups, 2);
    assert_eq!(result.stitch_count, 3);
}

#[test]
fn empty_reference_is_skipped_end_to_end() {
    let raw = r#"{
        "application": "kogin",
        "bbox": [0, 0, 10, 2],
        "data": [
            {"layer": true, "name": "Layer 1", "children": [
                {"ref": "", "coords": [[4, 1]]},
                {"ref": "3-000000", "coords": [[0, 0]]}
            ]}
        ]
    }"#;

    let result = fingerprint_json(raw, &FingerprintConfig::default()).expect("fingerprint");
    assert_eq!(result.canonical, "3:0,0");
}

#[test]
fn oversized_stitch_length_is_an_error_not_a_crash() {
    for reference in ["18446744073709551615-000000", "99999999999999999999-000000"] {
        let pattern = single_layer(vec![PatternNode::leaf(reference, &[(0, 0)])]);
        let err = compute_fingerprint(&pattern, bbox(), &FingerprintConfig::default())
            .expect_err("oversized length should fail");
        assert!(matches!(err, FingerprintError::InvalidReference { .. }));
    }

    let long = single_layer(vec![PatternNode::leaf("4000000000-000000", &[(0, 0)])]);
    let result = fingerprint(&long, bbox());
    assert_eq!(result.canonical, "4000000000:0,0");
}

#[test]
fn offset_overflow_is_an_error_not_a_crash() {
    let pattern = vec![PatternNode::group(
        i64::MAX,
        0,
        vec![PatternNode::leaf("1-000000", &[(1, 0)])],
    )];
    let err = compute_fingerprint(&pattern, bbox(), &FingerprintConfig::default())
        .expect_err("offset overflow should fail");
    assert!(matches!(err, FingerprintError::InvalidCoordinate(_)));
}
