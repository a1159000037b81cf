//! Command handlers.
//!
//! # Design
//! A command name plus a flat string-keyed argument map selects one handler
//! (see [`run`]). Handlers are thin: each builds at most a couple of
//! requests through [`ApiClient`] and reshapes the normalized response into
//! a [`CommandOutput`] carrying both a human-readable string and structured
//! outputs. Any transport or decode failure aborts the command — there is no
//! partial success.
//!
//! Platform capabilities beyond HTTP (saving file content, resolving an
//! entry id to a file) come in through the [`Host`] trait so handlers stay
//! testable without a live platform.

use std::collections::HashMap;
use std::sync::OnceLock;

use regex::Regex;
use serde_json::{json, Value};

use crate::client::ApiClient;
use crate::error::{ApiError, Result};
use crate::http::{HttpMethod, Transport};
use crate::response::ResponseBody;

/// Injected host capabilities that are not HTTP.
pub trait Host {
    /// Persist file content, returning the host's handle for it.
    fn save_file(&self, content: &[u8]) -> Result<String>;

    /// Resolve an entry id to the name of the file it references, if the
    /// entry exists.
    fn file_name(&self, entry_id: &str) -> Option<String>;
}

/// A file produced by a command (download, upload echo).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileHandle {
    pub file_id: String,
    pub file_name: String,
    pub contents: String,
}

/// Result of one command: readable text plus optional structured outputs,
/// both always produced together on success.
#[derive(Debug, Clone, PartialEq)]
pub struct CommandOutput {
    pub human_readable: String,
    pub outputs: Option<Value>,
    pub outputs_prefix: Option<String>,
    pub file: Option<FileHandle>,
}

impl CommandOutput {
    fn readable(text: impl Into<String>) -> Self {
        Self {
            human_readable: text.into(),
            outputs: None,
            outputs_prefix: None,
            file: None,
        }
    }

    fn from_response(body: ResponseBody) -> Self {
        let human_readable = match &body {
            ResponseBody::Json(value) => {
                serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
            }
            ResponseBody::Text(text) => text.clone(),
        };
        Self {
            human_readable,
            outputs: Some(body.into_value()),
            outputs_prefix: None,
            file: None,
        }
    }
}

/// Dispatch a command by name. The `demisto-api-*` aliases are kept for
/// scripts written against the integration's previous command names.
pub fn run<T: Transport, H: Host>(
    client: &ApiClient<T>,
    host: &H,
    command: &str,
    args: &HashMap<String, String>,
) -> Result<CommandOutput> {
    let arg = |name: &str| args.get(name).map(String::as_str).filter(|v| !v.is_empty());
    match command {
        "test-module" => test_module(client),
        "core-api-get" | "demisto-api-get" => api_get(client, require(arg("uri"), "uri")?),
        "core-api-post" | "demisto-api-post" => {
            api_post(client, require(arg("uri"), "uri")?, arg("body"))
        }
        "core-api-put" | "demisto-api-put" => {
            api_put(client, require(arg("uri"), "uri")?, require(arg("body"), "body")?)
        }
        "core-api-delete" | "demisto-api-delete" => {
            api_delete(client, require(arg("uri"), "uri")?)
        }
        "core-api-multipart" | "demisto-api-multipart" => api_multipart(
            client,
            require(arg("uri"), "uri")?,
            require(arg("entryID"), "entryID")?,
            arg("body"),
        ),
        "core-api-download" | "demisto-api-download" => api_download(
            client,
            require(arg("uri"), "uri")?,
            arg("body"),
            arg("filename"),
            arg("description"),
        ),
        "core-delete-incidents" | "demisto-delete-incidents" => delete_incidents(
            client,
            &arg_to_list(arg("ids")),
            &arg_to_list(arg("fields")),
        ),
        "core-api-install-packs" | "demisto-api-install-packs" => install_packs(
            client,
            arg("packs_to_install"),
            arg("file_url"),
            arg("entry_id"),
            arg("skip_verify"),
            arg("skip_validation"),
        ),
        "core-api-file-upload" => file_upload(
            client,
            host,
            arg("incident_id"),
            arg("file_content"),
            arg("file_name"),
            arg("entryID"),
            arg("target"),
        ),
        "core-api-file-delete" => file_delete(client, require(arg("entry_id"), "entry_id")?),
        "core-api-file-check" => file_check(host, require(arg("entry_id"), "entry_id")?),
        other => Err(ApiError::Argument(format!("unknown command: {other}"))),
    }
}

fn require<'a>(value: Option<&'a str>, name: &str) -> Result<&'a str> {
    value.ok_or_else(|| ApiError::Argument(format!("missing required argument: {name}")))
}

/// Comma-separated list argument; a JSON array string is also accepted.
pub fn arg_to_list(arg: Option<&str>) -> Vec<String> {
    let raw = match arg {
        Some(raw) => raw.trim(),
        None => return Vec::new(),
    };
    if raw.is_empty() {
        return Vec::new();
    }
    if raw.starts_with('[') {
        if let Ok(Value::Array(items)) = serde_json::from_str::<Value>(raw) {
            return items
                .into_iter()
                .map(|item| match item {
                    Value::String(s) => s,
                    other => other.to_string(),
                })
                .collect();
        }
    }
    raw.split(',')
        .map(|part| part.trim().to_string())
        .filter(|part| !part.is_empty())
        .collect()
}

/// Connectivity probe: a lightweight identity GET. A failure here signals
/// misconfiguration before any real command runs.
pub fn test_module<T: Transport>(client: &ApiClient<T>) -> Result<CommandOutput> {
    client.send(HttpMethod::Get, "user", None)?;
    Ok(CommandOutput::readable("ok"))
}

pub fn api_get<T: Transport>(client: &ApiClient<T>, uri: &str) -> Result<CommandOutput> {
    let body = client.send(HttpMethod::Get, uri, None)?;
    Ok(CommandOutput::from_response(body))
}

pub fn api_post<T: Transport>(
    client: &ApiClient<T>,
    uri: &str,
    body: Option<&str>,
) -> Result<CommandOutput> {
    match body {
        Some(raw) => {
            validate_json(raw)?;
        }
        None => log::debug!("the request body is empty"),
    }
    let response = client.send(HttpMethod::Post, uri, body.map(String::from))?;
    Ok(CommandOutput::from_response(response))
}

pub fn api_put<T: Transport>(
    client: &ApiClient<T>,
    uri: &str,
    body: &str,
) -> Result<CommandOutput> {
    validate_json(body)?;
    let response = client.send(HttpMethod::Put, uri, Some(body.to_string()))?;
    Ok(CommandOutput::from_response(response))
}

pub fn api_delete<T: Transport>(client: &ApiClient<T>, uri: &str) -> Result<CommandOutput> {
    let body = client.send(HttpMethod::Delete, uri, None)?;
    Ok(CommandOutput::from_response(body))
}

pub fn api_multipart<T: Transport>(
    client: &ApiClient<T>,
    uri: &str,
    entry_id: &str,
    body: Option<&str>,
) -> Result<CommandOutput> {
    let response = client.send_multipart(uri, entry_id, body)?;
    Ok(CommandOutput::from_response(response))
}

/// Raw GET streamed to a file. The file name comes from the `filename`
/// argument, falling back to the response's `Content-Disposition`, falling
/// back to the saved path itself.
pub fn api_download<T: Transport>(
    client: &ApiClient<T>,
    uri: &str,
    body: Option<&str>,
    filename: Option<&str>,
    description: Option<&str>,
) -> Result<CommandOutput> {
    let response = client.send_raw(HttpMethod::Get, uri, body.map(String::from))?;
    let saved = response.saved_path.clone().ok_or_else(|| {
        ApiError::Transport("transport did not save the response body to a file".to_string())
    })?;
    let file_id = saved.display().to_string();
    let file_name = match filename {
        Some(name) => name.to_string(),
        None => disposition_filename(&response).unwrap_or_else(|| file_id.clone()),
    };
    Ok(CommandOutput {
        human_readable: format!("Downloaded {file_name}"),
        outputs: None,
        outputs_prefix: None,
        file: Some(FileHandle {
            file_id,
            file_name,
            contents: description.unwrap_or_default().to_string(),
        }),
    })
}

fn disposition_filename(response: &crate::http::HttpResponse) -> Option<String> {
    let disposition = response.header("Content-Disposition")?;
    let parts: Vec<&str> = disposition.split('=').collect();
    if parts.len() == 2 {
        Some(parts[1].to_string())
    } else {
        None
    }
}

/// Batch-delete incidents by id, optionally projecting the returned records
/// down to a field allow-list, and render a summary table.
pub fn delete_incidents<T: Transport>(
    client: &ApiClient<T>,
    ids: &[String],
    fields_to_keep: &[String],
) -> Result<CommandOutput> {
    let body = json!({
        "ids": ids,
        "all": false,
        "filter": {},
    });
    let response = client.send(HttpMethod::Post, "/incident/batchDelete", Some(body.to_string()))?;
    let mut value = response.into_value();
    let project = !fields_to_keep.is_empty()
        && !(fields_to_keep.len() == 1 && fields_to_keep[0] == "all");
    if project {
        if let Some(data) = value.get("data").cloned() {
            value["data"] = reduce_data(data, fields_to_keep);
        }
    }
    let human_readable =
        markdown_table("Core delete incidents", &value, &["data", "total", "notUpdated"]);
    Ok(CommandOutput {
        human_readable,
        outputs: Some(value),
        outputs_prefix: None,
        file: None,
    })
}

/// Keep only the allow-listed fields that are present and truthy.
fn reduce_one_entry(entry: &Value, fields_to_keep: &[String]) -> Value {
    let mut reduced = serde_json::Map::new();
    for field in fields_to_keep {
        if let Some(v) = entry.get(field) {
            if is_truthy(v) {
                reduced.insert(field.clone(), v.clone());
            }
        }
    }
    Value::Object(reduced)
}

fn reduce_data(data: Value, fields_to_keep: &[String]) -> Value {
    match data {
        Value::Array(entries) => Value::Array(
            entries
                .iter()
                .map(|entry| reduce_one_entry(entry, fields_to_keep))
                .collect(),
        ),
        Value::Object(_) => Value::Array(vec![reduce_one_entry(&data, fields_to_keep)]),
        other => other,
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// One-row markdown summary over the named top-level keys.
fn markdown_table(title: &str, value: &Value, columns: &[&str]) -> String {
    let cell = |column: &str| match value.get(column) {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    };
    let mut table = format!("### {title}\n");
    table.push_str(&format!("|{}|\n", columns.join("|")));
    table.push_str(&format!("|{}|\n", vec!["---"; columns.len()].join("|")));
    let cells: Vec<String> = columns.iter().map(|column| cell(column)).collect();
    table.push_str(&format!("|{}|\n", cells.join("|")));
    table
}

enum PackSource<'a> {
    /// Archive to download first (marketplace or direct link).
    Url(&'a str),
    /// Archive already present as a platform attachment.
    Entry(&'a str),
}

/// Install content packs. Fails fast on the first pack that does not
/// install; there is no partial-success aggregation.
pub fn install_packs<T: Transport>(
    client: &ApiClient<T>,
    packs_to_install: Option<&str>,
    file_url: Option<&str>,
    entry_id: Option<&str>,
    skip_verify: Option<&str>,
    skip_validation: Option<&str>,
) -> Result<CommandOutput> {
    if packs_to_install.is_none() && file_url.is_none() && entry_id.is_none() {
        return Err(ApiError::Argument(
            "either packs_to_install, file_url or entry_id must be provided".to_string(),
        ));
    }
    let upload_uri = pack_upload_uri(client, skip_verify, skip_validation);

    if let Some(url) = file_url {
        install_pack(client, PackSource::Url(url), &upload_uri)?;
        log::debug!("pack installed successfully from {url}");
        return Ok(CommandOutput::readable(format!(
            "The pack installed successfully from the file {url}"
        )));
    }
    if let Some(entry) = entry_id {
        install_pack(client, PackSource::Entry(entry), &upload_uri)?;
        log::debug!("pack installed successfully from an attachment");
        return Ok(CommandOutput::readable(
            "The pack installed successfully from the file.",
        ));
    }

    let packs = parse_pack_list(packs_to_install.unwrap_or_default())?;
    let mut installed = Vec::with_capacity(packs.len());
    for (pack_id, version) in packs {
        let url = format!(
            "{}{}/{}/{}.zip",
            client.config().marketplace_url,
            pack_id,
            version,
            pack_id
        );
        install_pack(client, PackSource::Url(&url), &upload_uri)?;
        log::debug!("{pack_id} pack installed successfully");
        installed.push(pack_id);
    }
    Ok(CommandOutput::readable(format!(
        "The following packs installed successfully: {}",
        installed.join(", ")
    )))
}

/// `packs_to_install` is a JSON list of single-entry `{pack_id: version}`
/// maps.
fn parse_pack_list(raw: &str) -> Result<Vec<(String, String)>> {
    let value: Value = serde_json::from_str(raw)
        .map_err(|e| ApiError::Argument(format!("packs_to_install is not valid JSON: {e}")))?;
    let entries = value.as_array().ok_or_else(|| {
        ApiError::Argument("packs_to_install must be a JSON list".to_string())
    })?;
    let mut packs = Vec::with_capacity(entries.len());
    for entry in entries {
        let pair = entry
            .as_object()
            .and_then(|map| map.iter().next())
            .and_then(|(id, version)| version.as_str().map(|v| (id.clone(), v.to_string())));
        match pair {
            Some(pair) => packs.push(pair),
            None => {
                return Err(ApiError::Argument(
                    "each pack entry must be a {\"pack_id\": \"version\"} map".to_string(),
                ))
            }
        }
    }
    Ok(packs)
}

/// Upload endpoint with the verification/validation switches the platform
/// version supports. Each switch defaults to true unless the argument is
/// literally "false".
fn pack_upload_uri<T: Transport>(
    client: &ApiClient<T>,
    skip_verify: Option<&str>,
    skip_validation: Option<&str>,
) -> String {
    let mut uri = String::from("contentpacks/installed/upload?");
    // skipVerify exists from 6.5.0, skipValidation from 6.6.0.
    if client.config().version_ge("6.5.0") {
        uri.push_str(if skip_verify == Some("false") {
            "skipVerify=false"
        } else {
            "skipVerify=true"
        });
    }
    if client.config().version_ge("6.6.0") {
        uri.push_str(if skip_validation == Some("false") {
            "&skipValidation=false"
        } else {
            "&skipValidation=true"
        });
    }
    uri
}

fn install_pack<T: Transport>(
    client: &ApiClient<T>,
    source: PackSource<'_>,
    upload_uri: &str,
) -> Result<()> {
    let file_ref = match source {
        PackSource::Entry(entry) => entry.to_string(),
        PackSource::Url(url) => {
            let response = client.fetch_to_file(url)?;
            let path = response.saved_path.ok_or_else(|| {
                ApiError::Transport(format!("failed to download pack file from {url}"))
            })?;
            path.display().to_string()
        }
    };
    client.send_multipart(upload_uri, &file_ref, Some("{}"))?;
    Ok(())
}

/// Upload file content to an incident, either as an incident attachment or
/// as a war-room entry.
pub fn file_upload<T: Transport, H: Host>(
    client: &ApiClient<T>,
    host: &H,
    incident_id: Option<&str>,
    file_content: Option<&str>,
    file_name: Option<&str>,
    entry_id: Option<&str>,
    target: Option<&str>,
) -> Result<CommandOutput> {
    if file_name.is_none() && entry_id.is_none() {
        return Err(ApiError::Argument(
            "either file_name or entryID must be provided".to_string(),
        ));
    }
    let incident_id = incident_id.unwrap_or_default();
    let content = file_content.unwrap_or_default();
    let name = file_name.unwrap_or_default();
    let service = if target == Some("Incident Attachment") {
        "incident"
    } else {
        "entry"
    };
    let body = json!({
        "files": {
            "file": {
                "value": content,
                "options": {
                    "filename": name,
                    "contentType": "application/octet-stream",
                },
            },
        },
    });
    let response = client.send(
        HttpMethod::Post,
        &format!("/{service}/upload/{incident_id}/attachment"),
        Some(body.to_string()),
    )?;

    let mut human_readable =
        format!("File {name} uploaded successfully to incident {incident_id}.");
    if target == Some("war room entry") {
        if let Some(id) = response
            .as_json()
            .and_then(|v| v.pointer("/entries/0/id"))
            .and_then(Value::as_str)
        {
            human_readable.push_str(&format!(" Entry ID is {id}"));
        }
    }
    let file_id = host.save_file(content.as_bytes())?;
    Ok(CommandOutput {
        human_readable,
        outputs: None,
        outputs_prefix: None,
        file: Some(FileHandle {
            file_id,
            file_name: name.to_string(),
            contents: content.to_string(),
        }),
    })
}

fn entry_id_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"(\d+)@(\d+)").expect("static pattern"))
}

/// The incident (investigation) id is the part after the `@` of an
/// `<entry>@<incident>` id.
fn incident_id_of(entry_id: &str) -> Result<String> {
    let captures = entry_id_pattern()
        .captures(entry_id)
        .ok_or_else(|| ApiError::Argument(format!("entry id unknown or malformatted: {entry_id}")))?;
    Ok(captures[2].to_string())
}

/// Delete the indicator behind an entry, then clear the `File` context key
/// of its investigation. The second call is best-effort cleanup: it is not
/// attempted when the delete fails, and a deleted indicator is not restored
/// when the cleanup fails.
pub fn file_delete<T: Transport>(client: &ApiClient<T>, entry_id: &str) -> Result<CommandOutput> {
    let incident_id = incident_id_of(entry_id)?;

    let body = json!({ "id": entry_id });
    client
        .send(
            HttpMethod::Post,
            &format!("/Indicators/delete/v2/{entry_id}"),
            Some(body.to_string()),
        )
        .map_err(|e| {
            ApiError::NotFound(format!("file {entry_id} already deleted or not found: {e}"))
        })?;

    let context_body = json!({
        "id": "",
        "version": 0,
        "investigationId": incident_id,
        "data": "!DeleteContext key=File",
        "args": null,
        "markdown": false,
    });
    client.send(HttpMethod::Delete, "/entry", Some(context_body.to_string()))?;

    Ok(CommandOutput {
        human_readable: format!("File {entry_id} deleted!"),
        outputs: Some(json!({ "EntryID": entry_id })),
        outputs_prefix: Some("File".to_string()),
        file: None,
    })
}

/// Report whether an entry resolves to a file on the host.
pub fn file_check<H: Host>(host: &H, entry_id: &str) -> Result<CommandOutput> {
    match host.file_name(entry_id) {
        Some(name) => Ok(CommandOutput {
            human_readable: format!("File {entry_id} exists under the name {name}!"),
            outputs: Some(json!({ entry_id: true })),
            outputs_prefix: Some("IsFileExists".to_string()),
            file: None,
        }),
        None => Ok(CommandOutput {
            human_readable: format!("File {entry_id} does not exist!"),
            outputs: Some(json!({ entry_id: false })),
            outputs_prefix: Some("IsFileExists".to_string()),
            file: None,
        }),
    }
}

fn validate_json(raw: &str) -> Result<Value> {
    serde_json::from_str(raw)
        .map_err(|e| ApiError::Argument(format!("body is not valid JSON: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::testutil::{ok_json, ok_saved, with_status, StubTransport, TestHost};

    fn client_with(responses: Vec<crate::http::HttpResponse>) -> ApiClient<StubTransport> {
        let mut config = Config::new("https://host");
        config.api_key = Some("key".to_string());
        config.platform_version = "6.10.0".to_string();
        ApiClient::new(config, StubTransport::new(responses))
    }

    fn client_with_config(
        config: Config,
        responses: Vec<crate::http::HttpResponse>,
    ) -> ApiClient<StubTransport> {
        ApiClient::new(config, StubTransport::new(responses))
    }

    #[test]
    fn unknown_command_is_an_argument_error() {
        let client = client_with(Vec::new());
        let err = run(&client, &TestHost::new(), "core-api-reboot", &HashMap::new()).unwrap_err();
        assert!(matches!(err, ApiError::Argument(_)));
    }

    #[test]
    fn test_module_returns_ok() {
        let client = client_with(vec![ok_json(r#"{"username":"admin"}"#)]);
        let output = test_module(&client).unwrap();
        assert_eq!(output.human_readable, "ok");
        let requests = client.transport().requests.borrow();
        assert_eq!(requests[0].url, "https://host/user");
    }

    #[test]
    fn api_put_requires_a_body() {
        let client = client_with(Vec::new());
        let args: HashMap<String, String> =
            [("uri".to_string(), "/settings".to_string())].into();
        let err = run(&client, &TestHost::new(), "core-api-put", &args).unwrap_err();
        assert!(matches!(err, ApiError::Argument(_)));
        assert!(client.transport().requests.borrow().is_empty());
    }

    #[test]
    fn api_post_rejects_malformed_body() {
        let client = client_with(Vec::new());
        let err = api_post(&client, "/x", Some("{not json")).unwrap_err();
        assert!(matches!(err, ApiError::Argument(_)));
        assert!(client.transport().requests.borrow().is_empty());
    }

    #[test]
    fn download_prefers_explicit_filename() {
        let client = client_with(vec![ok_saved("/tmp/dl_1")]);
        let output = api_download(&client, "/artifact", None, Some("report.zip"), None).unwrap();
        let file = output.file.unwrap();
        assert_eq!(file.file_name, "report.zip");
        assert_eq!(file.file_id, "/tmp/dl_1");
    }

    #[test]
    fn download_falls_back_to_content_disposition() {
        let mut response = ok_saved("/tmp/dl_2");
        response.headers.push((
            "Content-Disposition".to_string(),
            "attachment; filename=export.csv".to_string(),
        ));
        let client = client_with(vec![response]);
        let output =
            api_download(&client, "/artifact", None, None, Some("nightly export")).unwrap();
        let file = output.file.unwrap();
        assert_eq!(file.file_name, "export.csv");
        assert_eq!(file.contents, "nightly export");
    }

    #[test]
    fn delete_incidents_projects_fields_and_renders_table() {
        let client = client_with(vec![ok_json(
            r#"{"data":[{"id":"4","name":"phish","status":0,"owner":""}],"total":1,"notUpdated":0}"#,
        )]);
        let ids = vec!["4".to_string()];
        let fields = vec!["id".to_string(), "name".to_string(), "status".to_string()];
        let output = delete_incidents(&client, &ids, &fields).unwrap();

        let requests = client.transport().requests.borrow();
        let sent: Value = serde_json::from_str(requests[0].body.as_deref().unwrap()).unwrap();
        assert_eq!(sent["ids"], json!(["4"]));
        assert_eq!(sent["all"], json!(false));

        let data = &output.outputs.as_ref().unwrap()["data"][0];
        assert_eq!(data["id"], "4");
        assert_eq!(data["name"], "phish");
        // status 0 and empty owner are falsy, so they are dropped.
        assert!(data.get("status").is_none());
        assert!(data.get("owner").is_none());

        assert!(output.human_readable.contains("Core delete incidents"));
        assert!(output.human_readable.contains("|data|total|notUpdated|"));
    }

    #[test]
    fn delete_incidents_keeps_all_fields_for_all_keyword() {
        let client = client_with(vec![ok_json(
            r#"{"data":[{"id":"4","status":0}],"total":1,"notUpdated":0}"#,
        )]);
        let ids = vec!["4".to_string()];
        let fields = vec!["all".to_string()];
        let output = delete_incidents(&client, &ids, &fields).unwrap();
        let data = &output.outputs.as_ref().unwrap()["data"][0];
        assert_eq!(data["status"], 0);
    }

    #[test]
    fn install_packs_requires_a_source() {
        let client = client_with(Vec::new());
        let err = install_packs(&client, None, None, None, None, None).unwrap_err();
        assert!(matches!(err, ApiError::Argument(_)));
    }

    #[test]
    fn install_packs_builds_marketplace_url_and_reports_pack() {
        let mut config = Config::new("https://host");
        config.api_key = Some("key".to_string());
        config.platform_version = "6.10.0".to_string();
        config.marketplace_url = "https://marketplace.example/".to_string();
        let client = client_with_config(
            config,
            vec![ok_saved("/tmp/pack_dl"), ok_json("{}")],
        );

        let output = install_packs(
            &client,
            Some(r#"[{"pack-a":"1.0.0"}]"#),
            None,
            None,
            None,
            None,
        )
        .unwrap();
        assert_eq!(
            output.human_readable,
            "The following packs installed successfully: pack-a"
        );

        let requests = client.transport().requests.borrow();
        assert_eq!(
            requests[0].url,
            "https://marketplace.example/pack-a/1.0.0/pack-a.zip"
        );
        assert!(requests[0].save_to_file);
        // Marketplace download is unauthenticated.
        assert!(requests[0].headers.is_empty());

        let multiparts = client.transport().multiparts.borrow();
        assert_eq!(multiparts[0].file_ref, "/tmp/pack_dl");
        assert_eq!(
            multiparts[0].url,
            "https://host/contentpacks/installed/upload?skipVerify=true&skipValidation=true"
        );
    }

    #[test]
    fn install_packs_fails_fast_on_first_failure() {
        let client = client_with(vec![
            ok_saved("/tmp/a"),
            ok_json("{}"),
            with_status(500, "boom"),
        ]);
        let err = install_packs(
            &client,
            Some(r#"[{"pack-a":"1.0.0"},{"pack-b":"2.0.0"}]"#),
            None,
            None,
            None,
            None,
        )
        .unwrap_err();
        assert!(matches!(err, ApiError::Request { status: 500, .. }));
        // pack-b's upload never happened.
        assert_eq!(client.transport().multiparts.borrow().len(), 1);
    }

    #[test]
    fn pack_upload_uri_respects_platform_version() {
        let mut config = Config::new("https://host");
        config.platform_version = "6.4.0".to_string();
        let client = client_with_config(config, Vec::new());
        assert_eq!(
            pack_upload_uri(&client, None, None),
            "contentpacks/installed/upload?"
        );

        let mut config = Config::new("https://host");
        config.platform_version = "6.5.2".to_string();
        let client = client_with_config(config, Vec::new());
        assert_eq!(
            pack_upload_uri(&client, Some("false"), None),
            "contentpacks/installed/upload?skipVerify=false"
        );

        let mut config = Config::new("https://host");
        config.platform_version = "6.6.0".to_string();
        let client = client_with_config(config, Vec::new());
        assert_eq!(
            pack_upload_uri(&client, None, Some("false")),
            "contentpacks/installed/upload?skipVerify=true&skipValidation=false"
        );
    }

    #[test]
    fn file_upload_requires_name_or_entry() {
        let client = client_with(Vec::new());
        let err = file_upload(
            &client,
            &TestHost::new(),
            Some("7"),
            Some("data"),
            None,
            None,
            None,
        )
        .unwrap_err();
        assert!(matches!(err, ApiError::Argument(_)));
        assert!(client.transport().requests.borrow().is_empty());
    }

    #[test]
    fn file_upload_as_incident_attachment() {
        let client = client_with(vec![ok_json("{}")]);
        let host = TestHost::new();
        let output = file_upload(
            &client,
            &host,
            Some("7"),
            Some("contents"),
            Some("evidence.txt"),
            None,
            Some("Incident Attachment"),
        )
        .unwrap();
        assert_eq!(
            output.human_readable,
            "File evidence.txt uploaded successfully to incident 7."
        );
        let requests = client.transport().requests.borrow();
        assert_eq!(requests[0].url, "https://host/incident/upload/7/attachment");
        assert_eq!(host.saved.borrow().len(), 1);
    }

    #[test]
    fn file_upload_as_war_room_entry_reports_entry_id() {
        let client = client_with(vec![ok_json(r#"{"entries":[{"id":"9@7"}]}"#)]);
        let output = file_upload(
            &client,
            &TestHost::new(),
            Some("7"),
            Some("contents"),
            Some("evidence.txt"),
            None,
            Some("war room entry"),
        )
        .unwrap();
        assert!(output.human_readable.ends_with("Entry ID is 9@7"));
        let requests = client.transport().requests.borrow();
        assert_eq!(requests[0].url, "https://host/entry/upload/7/attachment");
    }

    #[test]
    fn file_delete_rejects_malformed_entry_id() {
        let client = client_with(Vec::new());
        let err = file_delete(&client, "not-an-entry").unwrap_err();
        assert!(matches!(err, ApiError::Argument(_)));
        assert!(client.transport().requests.borrow().is_empty());
    }

    #[test]
    fn file_delete_issues_delete_then_context_clear() {
        let client = client_with(vec![ok_json("{}"), ok_json("{}")]);
        let output = file_delete(&client, "4@2").unwrap();
        assert_eq!(output.human_readable, "File 4@2 deleted!");
        assert_eq!(output.outputs_prefix.as_deref(), Some("File"));

        let requests = client.transport().requests.borrow();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0].url, "https://host/Indicators/delete/v2/4@2");
        assert_eq!(requests[1].url, "https://host/entry");
        assert_eq!(requests[1].method, HttpMethod::Delete);
        let context: Value =
            serde_json::from_str(requests[1].body.as_deref().unwrap()).unwrap();
        assert_eq!(context["investigationId"], "2");
        assert_eq!(context["data"], "!DeleteContext key=File");
    }

    #[test]
    fn file_delete_maps_failure_to_not_found_and_skips_cleanup() {
        let client = client_with(vec![with_status(404, "no such indicator")]);
        let err = file_delete(&client, "4@2").unwrap_err();
        assert!(matches!(err, ApiError::NotFound(_)));
        assert_eq!(client.transport().requests.borrow().len(), 1);
    }

    #[test]
    fn file_check_reports_existence() {
        let host = TestHost::with_file("4@2", "evidence.txt");
        let exists = file_check(&host, "4@2").unwrap();
        assert_eq!(
            exists.human_readable,
            "File 4@2 exists under the name evidence.txt!"
        );
        assert_eq!(exists.outputs.unwrap()["4@2"], true);
        assert_eq!(exists.outputs_prefix.as_deref(), Some("IsFileExists"));

        let missing = file_check(&host, "9@9").unwrap();
        assert_eq!(missing.human_readable, "File 9@9 does not exist!");
        assert_eq!(missing.outputs.unwrap()["9@9"], false);
    }

    #[test]
    fn arg_to_list_handles_commas_json_and_empty() {
        assert_eq!(arg_to_list(None), Vec::<String>::new());
        assert_eq!(arg_to_list(Some("")), Vec::<String>::new());
        assert_eq!(arg_to_list(Some("a, b ,c")), vec!["a", "b", "c"]);
        assert_eq!(arg_to_list(Some(r#"["a","b"]"#)), vec!["a", "b"]);
        assert_eq!(arg_to_list(Some("all")), vec!["all"]);
    }

    #[test]
    fn truthiness_matches_field_projection_rules() {
        assert!(!is_truthy(&Value::Null));
        assert!(!is_truthy(&json!(0)));
        assert!(!is_truthy(&json!("")));
        assert!(!is_truthy(&json!(false)));
        assert!(is_truthy(&json!("x")));
        assert!(is_truthy(&json!(3)));
        assert!(is_truthy(&json!([])));
    }

    #[test]
    fn markdown_table_renders_missing_columns_empty() {
        let table = markdown_table("T", &json!({"total": 2}), &["data", "total"]);
        assert_eq!(table, "### T\n|data|total|\n|---|---|\n||2|\n");
    }
}
