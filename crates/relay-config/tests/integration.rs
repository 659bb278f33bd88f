use relay_config::{ConfigError, RunConfiguration, validate_run_configuration};

#[test]
fn trigger_payload_text_validates_end_to_end() -> anyhow::Result<()> {
    let text = r#"{
        "s3_bucket": "s3-bucket-poc",
        "s3_object_prefix": "raw/dataset_test/table_test/",
        "gcs_bucket": "gcs-bucket-poc"
    }"#;
    let conf = RunConfiguration::from_json_str(text)?;
    let parameters = validate_run_configuration(Some(conf.as_value()))?;

    assert_eq!(parameters.source_bucket(), "s3-bucket-poc");
    assert_eq!(
        parameters.source_object_prefix(),
        "raw/dataset_test/table_test/"
    );
    assert_eq!(parameters.destination_bucket(), "gcs-bucket-poc");
    assert_eq!(
        parameters.destination_prefix(),
        parameters.source_object_prefix()
    );
    Ok(())
}

#[test]
fn blank_and_malformed_payloads_are_rejected() -> anyhow::Result<()> {
    let blank = RunConfiguration::from_json_str("  \n")?;
    assert!(matches!(
        validate_run_configuration(Some(blank.as_value())),
        Err(ConfigError::Missing)
    ));

    assert!(matches!(
        RunConfiguration::from_json_str("{\"s3_bucket\": "),
        Err(ConfigError::Parse { .. })
    ));

    let list = RunConfiguration::from_json_str("[\"s3_bucket\"]")?;
    assert!(matches!(
        validate_run_configuration(Some(list.as_value())),
        Err(ConfigError::NotAMapping { kind: "array" })
    ));
    Ok(())
}
