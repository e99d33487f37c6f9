//! Game data documents
//!
//! A document is one JSON file of the game's data directory, walked depth first over its
//! objects. Translatable strings are found in a few well-known places:
//!
//! | where                                 | what is done                       |
//! |---------------------------------------|------------------------------------|
//! | event command 401, every parameter    | translated, then reflowed          |
//! | event command 102, `parameters[0][*]` | translated                         |
//! | event command 356, `parameters[0]`    | prose tail translated              |
//! | event command 324/402, `parameters[1]`| translated                         |
//! | `displayName`                         | translated                         |
//! | database `name` / `description`       | translated (description reflowed)  |
//! | `System.json` title and terms         | kept as is unless edited by hand   |
//!
//! Consecutive 401 commands are the lines of one message box. They are collapsed into one
//! command before translation so the translator sees whole sentences, and split back into
//! one command per reflowed line afterwards.
//!
//! Fields are addressed by JSON pointer (RFC 6901) so that collecting them, translating them
//! concurrently and writing them back are separate passes.

use crate::error::{MtError, MtResult};
use serde_json::{Map, Value};
use std::path::Path;

/// Show Text: one line of a message box
pub const TEXT_CODE: i64 = 401;
/// Show Choices
pub const CHOICES_CODE: i64 = 102;
/// Change Nickname
pub const NICKNAME_CODE: i64 = 324;
/// Plugin Command
pub const PLUGIN_COMMAND_CODE: i64 = 356;
/// When [choice] branch label
pub const CHOICE_BRANCH_CODE: i64 = 402;

const DATABASE_FILES: &[&str] = &[
    "Items.json",
    "Actors.json",
    "Weapons.json",
    "Enemies.json",
    "Armors.json",
    "Skills.json",
];

const SYSTEM_FILE: &str = "System.json";

/// Which extra fields a document carries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    /// Records with a `name` and a `description`
    Database,
    /// Game title and UI terms
    System,
    /// Maps, common events and everything else
    Events,
}

impl DocumentKind {
    pub fn from_file_name(file_name: &str) -> Self {
        if DATABASE_FILES.contains(&file_name) {
            DocumentKind::Database
        } else if file_name == SYSTEM_FILE {
            DocumentKind::System
        } else {
            DocumentKind::Events
        }
    }
}

/// What to do with a field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldAction {
    /// Run through the translation pipeline
    Translate,
    /// Run through the pipeline and reflow into a description box
    Description,
    /// Translate the prose tail of a plugin command
    PluginCommand,
    /// Leave untranslated, but record it in the cache
    Keep,
}

/// One string field of a document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextField {
    /// JSON pointer to the string
    pub pointer: String,
    pub text: String,
    pub action: FieldAction,
}

/// Read a document
pub fn load_document(path: &Path) -> MtResult<Value> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        MtError::DocumentError(format!("Failed to read '{}': {}", path.display(), e))
    })?;
    serde_json::from_str(&content).map_err(|e| {
        MtError::DocumentError(format!("Failed to parse '{}': {}", path.display(), e))
    })
}

/// Write a document as compact JSON, non-ASCII kept verbatim
pub fn save_document(path: &Path, document: &Value) -> MtResult<()> {
    let json = serde_json::to_string(document)?;
    std::fs::write(path, json).map_err(|e| {
        MtError::DocumentError(format!("Failed to write '{}': {}", path.display(), e))
    })
}

/// Call `f` on every object of the tree, parents before children
pub fn for_each_object_mut<F>(value: &mut Value, f: &mut F)
where
    F: FnMut(&mut Map<String, Value>),
{
    match value {
        Value::Object(map) => {
            f(map);
            for child in map.values_mut() {
                for_each_object_mut(child, f);
            }
        }
        Value::Array(items) => {
            for child in items {
                for_each_object_mut(child, f);
            }
        }
        _ => {}
    }
}

fn command_code(item: &Value) -> Option<i64> {
    item.get("code").and_then(Value::as_i64)
}

fn first_parameter(item: &Value) -> Option<&str> {
    item.get("parameters")
        .and_then(|params| params.get(0))
        .and_then(Value::as_str)
}

/// Merge runs of consecutive 401 commands into their first command
///
/// The first command's first parameter becomes the newline-joined text of the run. Returns the
/// number of commands removed.
pub fn collapse_messages(document: &mut Value) -> usize {
    let mut removed = 0;
    for_each_object_mut(document, &mut |object| {
        let Some(Value::Array(items)) = object.get_mut("list") else {
            return;
        };

        let mut collapsed: Vec<Value> = Vec::with_capacity(items.len());
        let mut run: Option<(Value, Vec<String>)> = None;
        for item in items.drain(..) {
            if command_code(&item) == Some(TEXT_CODE) {
                let line = first_parameter(&item).unwrap_or_default().to_string();
                match run.as_mut() {
                    Some((_, lines)) => {
                        lines.push(line);
                        removed += 1;
                    }
                    None => run = Some((item, vec![line])),
                }
                continue;
            }
            if let Some((first, lines)) = run.take() {
                collapsed.push(with_first_parameter(first, lines.join("\n")));
            }
            collapsed.push(item);
        }
        if let Some((first, lines)) = run.take() {
            collapsed.push(with_first_parameter(first, lines.join("\n")));
        }
        *items = collapsed;
    });
    removed
}

fn with_first_parameter(mut item: Value, text: String) -> Value {
    if let Some(Value::Array(params)) = item.get_mut("parameters") {
        match params.first_mut() {
            Some(first) => *first = Value::String(text),
            None => params.push(Value::String(text)),
        }
    }
    item
}

/// Replace every non-empty 401 command with one command per line returned by `split`
///
/// Each new command is a copy of the original with `parameters` set to `[line]`.
pub fn split_messages<F>(document: &mut Value, mut split: F)
where
    F: FnMut(&str) -> Vec<String>,
{
    for_each_object_mut(document, &mut |object| {
        let Some(Value::Array(items)) = object.get_mut("list") else {
            return;
        };

        let mut expanded = Vec::with_capacity(items.len());
        for item in items.drain(..) {
            let text = first_parameter(&item)
                .filter(|text| command_code(&item) == Some(TEXT_CODE) && !text.is_empty())
                .map(str::to_string);
            let Some(text) = text else {
                expanded.push(item);
                continue;
            };
            for line in split(&text) {
                let mut line_item = item.clone();
                if let Some(object) = line_item.as_object_mut() {
                    object.insert(
                        "parameters".to_string(),
                        Value::Array(vec![Value::String(line)]),
                    );
                }
                expanded.push(line_item);
            }
        }
        *items = expanded;
    });
}

/// Escape one JSON pointer reference token
fn escape_token(token: &str) -> String {
    token.replace('~', "~0").replace('/', "~1")
}

fn child_pointer(base: &str, token: &str) -> String {
    format!("{}/{}", base, escape_token(token))
}

/// Collect every string field to translate or keep, in document order
///
/// Empty strings and non-string values are skipped.
pub fn collect_fields(document: &Value, kind: DocumentKind) -> Vec<TextField> {
    let mut fields = Vec::new();
    let mut pointer = String::new();
    walk(document, kind, &mut pointer, &mut fields);
    fields
}

fn walk(value: &Value, kind: DocumentKind, pointer: &mut String, fields: &mut Vec<TextField>) {
    match value {
        Value::Object(map) => {
            visit_object(map, kind, pointer, fields);
            for (key, child) in map {
                let len = pointer.len();
                pointer.push('/');
                pointer.push_str(&escape_token(key));
                walk(child, kind, pointer, fields);
                pointer.truncate(len);
            }
        }
        Value::Array(items) => {
            for (i, child) in items.iter().enumerate() {
                let len = pointer.len();
                pointer.push('/');
                pointer.push_str(&i.to_string());
                walk(child, kind, pointer, fields);
                pointer.truncate(len);
            }
        }
        _ => {}
    }
}

fn push_field(fields: &mut Vec<TextField>, pointer: String, value: &Value, action: FieldAction) {
    if let Some(text) = value.as_str().filter(|text| !text.is_empty()) {
        fields.push(TextField {
            pointer,
            text: text.to_string(),
            action,
        });
    }
}

fn visit_object(
    object: &Map<String, Value>,
    kind: DocumentKind,
    pointer: &str,
    fields: &mut Vec<TextField>,
) {
    match kind {
        DocumentKind::Database => {
            for (key, action) in [
                ("name", FieldAction::Translate),
                ("description", FieldAction::Description),
            ] {
                if let Some(value) = object.get(key) {
                    push_field(fields, child_pointer(pointer, key), value, action);
                }
            }
        }
        DocumentKind::System => visit_system(object, pointer, fields),
        DocumentKind::Events => {}
    }

    if let Some(value) = object.get("displayName") {
        push_field(
            fields,
            child_pointer(pointer, "displayName"),
            value,
            FieldAction::Translate,
        );
    }

    let Some(code) = object.get("code").and_then(Value::as_i64) else {
        return;
    };
    let Some(Value::Array(params)) = object.get("parameters") else {
        return;
    };
    let params_pointer = child_pointer(pointer, "parameters");
    match code {
        CHOICES_CODE => {
            if let Some(Value::Array(choices)) = params.first() {
                for (i, choice) in choices.iter().enumerate() {
                    push_field(
                        fields,
                        format!("{}/0/{}", params_pointer, i),
                        choice,
                        FieldAction::Translate,
                    );
                }
            }
        }
        PLUGIN_COMMAND_CODE => {
            if let Some(command) = params.first() {
                push_field(
                    fields,
                    format!("{}/0", params_pointer),
                    command,
                    FieldAction::PluginCommand,
                );
            }
        }
        TEXT_CODE => {
            for (i, line) in params.iter().enumerate() {
                push_field(
                    fields,
                    format!("{}/{}", params_pointer, i),
                    line,
                    FieldAction::Translate,
                );
            }
        }
        NICKNAME_CODE | CHOICE_BRANCH_CODE => {
            if let Some(label) = params.get(1) {
                push_field(
                    fields,
                    format!("{}/1", params_pointer),
                    label,
                    FieldAction::Translate,
                );
            }
        }
        _ => {}
    }
}

fn visit_system(object: &Map<String, Value>, pointer: &str, fields: &mut Vec<TextField>) {
    if let Some(title) = object.get("gameTitle") {
        push_field(
            fields,
            child_pointer(pointer, "gameTitle"),
            title,
            FieldAction::Keep,
        );
    }
    let Some(Value::Object(terms)) = object.get("terms") else {
        return;
    };
    let terms_pointer = child_pointer(pointer, "terms");
    for table in ["params", "basic"] {
        if let Some(Value::Array(items)) = terms.get(table) {
            let table_pointer = child_pointer(&terms_pointer, table);
            for (i, item) in items.iter().enumerate() {
                push_field(
                    fields,
                    format!("{}/{}", table_pointer, i),
                    item,
                    FieldAction::Keep,
                );
            }
        }
    }
    if let Some(Value::Object(messages)) = terms.get("messages") {
        let messages_pointer = child_pointer(&terms_pointer, "messages");
        for (key, message) in messages {
            push_field(
                fields,
                child_pointer(&messages_pointer, key),
                message,
                FieldAction::Keep,
            );
        }
    }
}

/// Overwrite the string at `pointer`
pub fn set_field(document: &mut Value, pointer: &str, text: String) -> MtResult<()> {
    let slot = document
        .pointer_mut(pointer)
        .ok_or_else(|| MtError::DocumentError(format!("No field at '{}'", pointer)))?;
    *slot = Value::String(text);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn event_page() -> Value {
        json!({
            "events": [null, {
                "name": "EV001",
                "pages": [{
                    "list": [
                        {"code": 101, "indent": 0, "parameters": ["Actor1", 0, 0, 2]},
                        {"code": 401, "indent": 0, "parameters": ["Hello there,"]},
                        {"code": 401, "indent": 0, "parameters": ["traveller."]},
                        {"code": 102, "indent": 0, "parameters": [["Yes", "No"], 1]},
                        {"code": 402, "indent": 0, "parameters": [0, "Yes"]},
                        {"code": 356, "indent": 1, "parameters": ["GabText Nice"]},
                        {"code": 401, "indent": 0, "parameters": ["Bye"]},
                        {"code": 0, "indent": 0, "parameters": []}
                    ]
                }]
            }]
        })
    }

    fn list_of(document: &Value) -> &Vec<Value> {
        document["events"][1]["pages"][0]["list"].as_array().unwrap()
    }

    // ============================================================================
    // Message collapse / split
    // ============================================================================

    #[test]
    fn test_collapse_joins_consecutive_text() {
        let mut document = event_page();
        assert_eq!(collapse_messages(&mut document), 1);

        let list = list_of(&document);
        assert_eq!(list.len(), 7);
        assert_eq!(list[1]["parameters"][0], "Hello there,\ntraveller.");
        assert_eq!(list[5]["parameters"][0], "Bye");
        assert_eq!(list[6]["code"], 0);
    }

    #[test]
    fn test_collapse_run_at_end_of_list() {
        let mut document = json!({"list": [
            {"code": 401, "parameters": ["a"]},
            {"code": 401, "parameters": ["b"]}
        ]});
        collapse_messages(&mut document);
        assert_eq!(document["list"], json!([{"code": 401, "parameters": ["a\nb"]}]));
    }

    #[test]
    fn test_split_one_command_per_line() {
        let mut document = json!({"list": [
            {"code": 401, "indent": 2, "parameters": ["one two"]},
            {"code": 401, "parameters": [""]},
            {"code": 0, "parameters": []}
        ]});
        split_messages(&mut document, |text| {
            text.split(' ').map(str::to_string).collect()
        });
        assert_eq!(
            document["list"],
            json!([
                {"code": 401, "indent": 2, "parameters": ["one"]},
                {"code": 401, "indent": 2, "parameters": ["two"]},
                {"code": 401, "parameters": [""]},
                {"code": 0, "parameters": []}
            ])
        );
    }

    #[test]
    fn test_collapse_then_split_restores_lines() {
        let original = event_page();
        let mut document = original.clone();
        collapse_messages(&mut document);
        split_messages(&mut document, |text| {
            text.split('\n').map(str::to_string).collect()
        });
        assert_eq!(document, original);
    }

    // ============================================================================
    // Field collection
    // ============================================================================

    #[test]
    fn test_event_fields() {
        let mut document = event_page();
        collapse_messages(&mut document);
        let fields = collect_fields(&document, DocumentKind::Events);
        let found: Vec<(&str, &str, FieldAction)> = fields
            .iter()
            .map(|f| (f.pointer.as_str(), f.text.as_str(), f.action))
            .collect();

        let list = "/events/1/pages/0/list";
        assert_eq!(
            found,
            vec![
                (
                    format!("{}/1/parameters/0", list).as_str(),
                    "Hello there,\ntraveller.",
                    FieldAction::Translate
                ),
                (
                    format!("{}/2/parameters/0/0", list).as_str(),
                    "Yes",
                    FieldAction::Translate
                ),
                (
                    format!("{}/2/parameters/0/1", list).as_str(),
                    "No",
                    FieldAction::Translate
                ),
                (
                    format!("{}/3/parameters/1", list).as_str(),
                    "Yes",
                    FieldAction::Translate
                ),
                (
                    format!("{}/4/parameters/0", list).as_str(),
                    "GabText Nice",
                    FieldAction::PluginCommand
                ),
                (
                    format!("{}/5/parameters/0", list).as_str(),
                    "Bye",
                    FieldAction::Translate
                ),
            ]
        );
    }

    #[test]
    fn test_event_name_not_collected_outside_database() {
        let fields = collect_fields(&event_page(), DocumentKind::Events);
        assert!(fields.iter().all(|f| f.text != "EV001"));
    }

    #[test]
    fn test_database_fields() {
        let document = json!([
            null,
            {"id": 1, "name": "Potion", "description": "Heals a bit.", "note": "<x>"},
            {"id": 2, "name": "", "description": "Nothing"}
        ]);
        let fields = collect_fields(&document, DocumentKind::from_file_name("Items.json"));
        assert_eq!(
            fields,
            vec![
                TextField {
                    pointer: "/1/name".to_string(),
                    text: "Potion".to_string(),
                    action: FieldAction::Translate,
                },
                TextField {
                    pointer: "/1/description".to_string(),
                    text: "Heals a bit.".to_string(),
                    action: FieldAction::Description,
                },
                TextField {
                    pointer: "/2/description".to_string(),
                    text: "Nothing".to_string(),
                    action: FieldAction::Description,
                },
            ]
        );
    }

    #[test]
    fn test_system_fields_are_kept() {
        let document = json!({
            "gameTitle": "Quest",
            "terms": {
                "basic": ["Level"],
                "params": ["Max HP"],
                "messages": {"actionFailure": "There was no effect on %1!"}
            }
        });
        let fields = collect_fields(&document, DocumentKind::from_file_name("System.json"));
        let pointers: Vec<&str> = fields.iter().map(|f| f.pointer.as_str()).collect();
        assert_eq!(
            pointers,
            vec![
                "/gameTitle",
                "/terms/params/0",
                "/terms/basic/0",
                "/terms/messages/actionFailure"
            ]
        );
        assert!(fields.iter().all(|f| f.action == FieldAction::Keep));
    }

    #[test]
    fn test_display_name_anywhere() {
        let document = json!({"displayName": "Old Town", "data": [{"displayName": 3}]});
        let fields = collect_fields(&document, DocumentKind::Events);
        assert_eq!(fields.len(), 1);
        assert_eq!(fields[0].pointer, "/displayName");
    }

    #[test]
    fn test_pointer_escaping() {
        let mut document = json!({"a/b": {"displayName": "x"}, "c~d": {"displayName": "y"}});
        let fields = collect_fields(&document, DocumentKind::Events);
        let pointers: Vec<&str> = fields.iter().map(|f| f.pointer.as_str()).collect();
        assert!(pointers.contains(&"/a~1b/displayName"));
        assert!(pointers.contains(&"/c~0d/displayName"));

        for field in fields {
            set_field(&mut document, &field.pointer, field.text.to_uppercase()).unwrap();
        }
        assert_eq!(document["a/b"]["displayName"], "X");
        assert_eq!(document["c~d"]["displayName"], "Y");
    }

    #[test]
    fn test_set_missing_field() {
        let mut document = json!({});
        assert!(matches!(
            set_field(&mut document, "/nope", "x".to_string()),
            Err(MtError::DocumentError(_))
        ));
    }

    #[test]
    fn test_save_and_load_document() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Map001.json");
        let document = json!({"displayName": "Старый город"});
        save_document(&path, &document).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content, r#"{"displayName":"Старый город"}"#);
        assert_eq!(load_document(&path).unwrap(), document);
    }
}
