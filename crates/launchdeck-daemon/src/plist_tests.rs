use super::*;

const SAMPLE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE plist PUBLIC "-//Apple//DTD PLIST 1.0//EN" "http://www.apple.com/DTDs/PropertyList-1.0.dtd">
<plist version="1.0">
<dict>
	<key>Label</key>
	<string>com.lman.daily-brief</string>
	<key>ProgramArguments</key>
	<array>
		<string>/usr/local/bin/node</string>
		<string>/Users/lman/scripts/brief.js</string>
	</array>
	<key>StartCalendarInterval</key>
	<dict>
		<key>Hour</key>
		<integer>9</integer>
		<key>Minute</key>
		<integer>5</integer>
	</dict>
	<key>RunAtLoad</key>
	<false/>
	<key>Nice</key>
	<real>1.5</real>
	<key>EnvironmentVariables</key>
	<dict>
		<key>PATH</key>
		<string>/usr/bin:/bin &amp; more</string>
	</dict>
</dict>
</plist>
"#;

#[test]
fn test_parse_sample() {
    let root = parse(SAMPLE).unwrap();
    let dict = root.as_dict().unwrap();

    assert_eq!(dict.get("Label").and_then(|v| v.as_str()), Some("com.lman.daily-brief"));
    assert_eq!(dict.get("RunAtLoad").and_then(|v| v.as_bool()), Some(false));
    assert_eq!(dict.get("Nice"), Some(&PlistValue::Real(1.5)));

    let args = dict.get("ProgramArguments").and_then(|v| v.as_array()).unwrap();
    assert_eq!(args.len(), 2);
    assert_eq!(args[1].as_str(), Some("/Users/lman/scripts/brief.js"));

    let interval = dict.get("StartCalendarInterval").and_then(|v| v.as_dict()).unwrap();
    assert_eq!(interval.get("Hour").and_then(|v| v.as_integer()), Some(9));
    assert_eq!(interval.get("Minute").and_then(|v| v.as_integer()), Some(5));

    let env = dict.get("EnvironmentVariables").and_then(|v| v.as_dict()).unwrap();
    assert_eq!(env.get("PATH").and_then(|v| v.as_str()), Some("/usr/bin:/bin & more"));
}

#[test]
fn test_key_order_preserved() {
    let root = parse(SAMPLE).unwrap();
    let keys: Vec<&str> = root.as_dict().unwrap().keys().collect();
    assert_eq!(
        keys,
        vec!["Label", "ProgramArguments", "StartCalendarInterval", "RunAtLoad", "Nice", "EnvironmentVariables"]
    );
}

#[test]
fn test_written_document_parses_back() {
    let root = parse(SAMPLE).unwrap();
    let xml = to_xml(&root);

    assert!(xml.starts_with("<?xml version=\"1.0\""));
    assert!(xml.contains("<!DOCTYPE plist"));
    assert!(xml.contains("\t<key>Label</key>"));
    assert!(xml.contains("&amp; more"));
    assert_eq!(parse(&xml).unwrap(), root);
}

#[test]
fn test_empty_elements() {
    let xml = r#"<plist version="1.0"><dict><key>A</key><array/><key>B</key><dict/><key>C</key><string/><key>D</key><true/></dict></plist>"#;
    let root = parse(xml).unwrap();
    let dict = root.as_dict().unwrap();
    assert_eq!(dict.get("A"), Some(&PlistValue::Array(vec![])));
    assert_eq!(dict.get("B"), Some(&PlistValue::Dict(PlistDict::new())));
    assert_eq!(dict.get("C"), Some(&PlistValue::String(String::new())));
    assert_eq!(dict.get("D"), Some(&PlistValue::Boolean(true)));
}

#[test]
fn test_date_and_data_kept_verbatim() {
    let xml = "<plist><dict><key>When</key><date>2024-01-02T03:04:05Z</date><key>Blob</key><data>\n\tAAEC\n\tAw==\n</data></dict></plist>";
    let root = parse(xml).unwrap();
    let dict = root.as_dict().unwrap();
    assert_eq!(dict.get("When"), Some(&PlistValue::Date("2024-01-02T03:04:05Z".to_string())));
    assert_eq!(dict.get("Blob"), Some(&PlistValue::Data("AAECAw==".to_string())));
}

#[test]
fn test_dict_equality_ignores_order() {
    let a: PlistDict = [("Hour", 9i64), ("Minute", 0i64)].into_iter().collect();
    let b: PlistDict = [("Minute", 0i64), ("Hour", 9i64)].into_iter().collect();
    assert_eq!(a, b);

    let c: PlistDict = [("Hour", 9i64)].into_iter().collect();
    assert_ne!(a, c);
}

#[test]
fn test_insert_replaces_in_place() {
    let mut dict: PlistDict = [("A", 1i64), ("B", 2i64), ("C", 3i64)].into_iter().collect();
    dict.insert("B", 20i64);
    let keys: Vec<&str> = dict.keys().collect();
    assert_eq!(keys, vec!["A", "B", "C"]);
    assert_eq!(dict.get("B").and_then(|v| v.as_integer()), Some(20));

    assert_eq!(dict.remove("A"), Some(PlistValue::Integer(1)));
    assert!(!dict.contains_key("A"));
    assert_eq!(dict.len(), 2);
}

#[test]
fn test_missing_root_is_error() {
    assert!(matches!(parse("<dict></dict>"), Err(PlistError::Malformed(_))));
    assert!(matches!(parse(""), Err(PlistError::Malformed(_))));
}

#[test]
fn test_key_without_value_is_error() {
    let xml = "<plist><dict><key>Orphan</key></dict></plist>";
    assert!(matches!(parse(xml), Err(PlistError::Malformed(_))));
}

#[test]
fn test_invalid_integer_is_error() {
    let xml = "<plist><integer>nine</integer></plist>";
    assert!(matches!(parse(xml), Err(PlistError::Malformed(_))));
}

#[test]
fn test_unsupported_element_is_error() {
    let xml = "<plist><dict><key>A</key><blob>x</blob></dict></plist>";
    assert!(matches!(parse(xml), Err(PlistError::Malformed(_))));
}
