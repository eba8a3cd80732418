use retrace::{Bias, Consumer, Error, MappingOrder};

fn consumer(json: &str) -> Consumer {
    Consumer::from(json.as_bytes().to_vec()).unwrap()
}

// two concatenated one-line maps: a.js on generated line 1, b.js on line 2
const TWO_SECTIONS: &str = r#"{
    "version": 3,
    "file": "min.js",
    "sections": [
        {
            "offset": {"line": 0, "column": 0},
            "map": {"version": 3, "sources": ["a.js"], "mappings": "AAAA"}
        },
        {
            "offset": {"line": 1, "column": 0},
            "map": {"version": 3, "sources": ["b.js"], "mappings": "AAAA"}
        }
    ]
}"#;

#[test]
fn test_section_routing() {
    let consumer = consumer(TWO_SECTIONS);

    let found = consumer
        .original_position_for(1, 0, Bias::default())
        .unwrap()
        .unwrap();
    assert_eq!(found.source, "a.js");
    assert_eq!((found.line, found.column), (1, 0));

    // line 2 belongs to the second section
    let found = consumer
        .original_position_for(2, 0, Bias::default())
        .unwrap()
        .unwrap();
    assert_eq!(found.source, "b.js");
    assert_eq!((found.line, found.column), (1, 0));

    // routed to the last section, which has nothing past its first line
    assert_eq!(
        consumer.original_position_for(3, 0, Bias::default()).unwrap(),
        None
    );
}

#[test]
fn test_section_back_translation() {
    let consumer = consumer(TWO_SECTIONS);

    // the section-local answer (line 1) must come back in outer coordinates
    let span = consumer
        .generated_position_for("b.js", 1, 0, Bias::default())
        .unwrap()
        .unwrap();
    assert_eq!((span.line, span.column), (2, 0));

    let span = consumer
        .generated_position_for("a.js", 1, 0, Bias::default())
        .unwrap()
        .unwrap();
    assert_eq!((span.line, span.column), (1, 0));

    let spans = consumer
        .all_generated_positions_for("b.js", 1, None)
        .unwrap();
    assert_eq!(spans.len(), 1);
    assert_eq!((spans[0].line, spans[0].column), (2, 0));
}

#[test]
fn test_section_column_offset() {
    // a single section shifted 10 columns into the outer artifact
    let consumer = consumer(
        r#"{
            "version": 3,
            "sections": [
                {
                    "offset": {"line": 0, "column": 10},
                    "map": {"version": 3, "sources": ["a.js"], "mappings": "AAAA;AAAA"}
                }
            ]
        }"#,
    );

    // before the section starts
    assert_eq!(
        consumer.original_position_for(1, 5, Bias::default()).unwrap(),
        None
    );

    // the column offset applies on the section's first line...
    let found = consumer
        .original_position_for(1, 10, Bias::default())
        .unwrap()
        .unwrap();
    assert_eq!((found.source.as_str(), found.line, found.column), ("a.js", 1, 0));

    // ...but not on later lines
    let found = consumer
        .original_position_for(2, 0, Bias::default())
        .unwrap()
        .unwrap();
    assert_eq!((found.line, found.column), (1, 0));

    // the inverse transform shifts the first line back out
    let span = consumer
        .generated_position_for("a.js", 1, 0, Bias::default())
        .unwrap()
        .unwrap();
    assert_eq!((span.line, span.column), (1, 10));
}

#[test]
fn test_section_construction_errors() {
    assert!(matches!(
        Consumer::from(
            br#"{"version": 3, "sections": [
                {"offset": {"line": 0, "column": 0}, "url": "http://example.com/map.json"}
            ]}"#
            .to_vec()
        ),
        Err(Error::SectionUrlUnsupported(0))
    ));

    assert!(matches!(
        Consumer::from(
            br#"{"version": 3, "sections": [{"offset": {"line": 0, "column": 0}}]}"#.to_vec()
        ),
        Err(Error::SectionWithoutMap(0))
    ));

    // offsets must be non-decreasing
    assert!(matches!(
        Consumer::from(
            br#"{"version": 3, "sections": [
                {"offset": {"line": 1, "column": 0},
                 "map": {"version": 3, "sources": ["a.js"], "mappings": "AAAA"}},
                {"offset": {"line": 0, "column": 0},
                 "map": {"version": 3, "sources": ["b.js"], "mappings": "AAAA"}}
            ]}"#
            .to_vec()
        ),
        Err(Error::UnorderedSections(1))
    ));

    // a bad nested document fails the whole construction
    assert!(matches!(
        Consumer::from(
            br#"{"version": 3, "sections": [
                {"offset": {"line": 0, "column": 0}, "map": {"version": 2}}
            ]}"#
            .to_vec()
        ),
        Err(Error::UnsupportedVersion(Some(2)))
    ));
}

#[test]
fn test_section_source_content() {
    let consumer = consumer(
        r#"{
            "version": 3,
            "sections": [
                {
                    "offset": {"line": 0, "column": 0},
                    "map": {"version": 3, "sources": ["a.js"], "mappings": "AAAA"}
                },
                {
                    "offset": {"line": 1, "column": 0},
                    "map": {"version": 3, "sources": ["b.js"],
                            "sourcesContent": ["content b"], "mappings": "AAAA"}
                }
            ]
        }"#,
    );

    // probing walks the sections; only the outer call may fail
    assert_eq!(
        consumer.source_content_for("b.js", true).unwrap(),
        Some("content b")
    );
    assert_eq!(consumer.source_content_for("a.js", true).unwrap(), None);
    assert!(matches!(
        consumer.source_content_for("a.js", false),
        Err(Error::SourceMissing(..))
    ));

    // one section without content is enough to flip the conjunction
    assert!(!consumer.has_contents_of_all_sources());
}

#[test]
fn test_sources_and_merged_enumeration() {
    let consumer = consumer(TWO_SECTIONS);

    assert_eq!(consumer.sources(), ["a.js", "b.js"]);

    let mappings = consumer.generated_mappings().unwrap();
    assert_eq!(mappings.len(), 2);
    assert_eq!(mappings[0].generated().line, 1);
    assert_eq!(mappings[1].generated().line, 2);

    let mut resolved = Vec::new();
    consumer
        .each_mapping(MappingOrder::Generated, |mapping| {
            resolved.push((mapping.generated_line, mapping.source.clone()))
        })
        .unwrap();
    assert_eq!(
        resolved,
        [(1, Some("a.js".to_owned())), (2, Some("b.js".to_owned()))]
    );
}

#[test]
fn test_merged_interner_shares_repeated_sources() {
    // both sections map the same original file; the merged view must give
    // it a single id
    let consumer = consumer(
        r#"{
            "version": 3,
            "sections": [
                {
                    "offset": {"line": 0, "column": 0},
                    "map": {"version": 3, "sources": ["shared.js"], "mappings": "AAAA"}
                },
                {
                    "offset": {"line": 1, "column": 0},
                    "map": {"version": 3, "sources": ["shared.js"], "mappings": "AAAA"}
                }
            ]
        }"#,
    );

    let mappings = consumer.generated_mappings().unwrap();
    assert_eq!(mappings.len(), 2);
    let ids = mappings
        .iter()
        .map(|mapping| mapping.source_info().unwrap().id)
        .collect::<Vec<_>>();
    assert_eq!(ids, [0, 0]);
}

#[test]
fn test_nested_indexed_sections() {
    // a section whose map is itself indexed
    let consumer = consumer(
        r#"{
            "version": 3,
            "sections": [
                {
                    "offset": {"line": 2, "column": 0},
                    "map": {
                        "version": 3,
                        "sections": [
                            {
                                "offset": {"line": 0, "column": 0},
                                "map": {"version": 3, "sources": ["b.js"], "mappings": "AAAA"}
                            }
                        ]
                    }
                }
            ]
        }"#,
    );

    let found = consumer
        .original_position_for(3, 0, Bias::default())
        .unwrap()
        .unwrap();
    assert_eq!((found.source.as_str(), found.line, found.column), ("b.js", 1, 0));

    // both translation layers applied in the merged view
    let mappings = consumer.generated_mappings().unwrap();
    assert_eq!(mappings.len(), 1);
    assert_eq!(mappings[0].generated().line, 3);

    let span = consumer
        .generated_position_for("b.js", 1, 0, Bias::default())
        .unwrap()
        .unwrap();
    assert_eq!((span.line, span.column), (3, 0));
}
