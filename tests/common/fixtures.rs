//! Test fixtures for Confluence API responses
//!
//! Realistic samples of the REST payloads the pipeline consumes, plus
//! provider answers for the vision fakes.

use serde_json::{Value, json};

/// Storage body with one embedded attachment image.
pub const CHART_BODY: &str = r#"<h2>Quartalszahlen</h2><p>Der Umsatz ist gestiegen.</p><ac:image ac:height="250"><ri:attachment ri:filename="chart.png" ri:version-at-save="1" /></ac:image><p>Details folgen.</p>"#;

pub fn space(id: i64, key: &str, name: &str) -> Value {
  json!({
    "id": id,
    "key": key,
    "name": name,
    "type": "global",
    "_links": {
      "webui": format!("/display/{key}"),
      "self": format!("https://wiki.example.com/rest/api/space/{key}")
    }
  })
}

/// A content listing entry of type `page` with an expanded storage body.
pub fn content_page(id: &str, title: &str, body: &str) -> Value {
  json!({
    "id": id,
    "type": "page",
    "status": "current",
    "title": title,
    "body": {
      "storage": {
        "value": body,
        "representation": "storage",
        "_expandable": {"content": format!("/rest/api/content/{id}")}
      },
      "_expandable": {"view": ""}
    },
    "extensions": {"position": 1},
    "_links": {
      "webui": format!("/pages/viewpage.action?pageId={id}"),
      "self": format!("https://wiki.example.com/rest/api/content/{id}")
    },
    "_expandable": {"children": format!("/rest/api/content/{id}/child")}
  })
}

/// A blog post entry; listed with pages but never exported.
pub fn blogpost(id: &str, title: &str) -> Value {
  let mut value = content_page(id, title, "<p>News</p>");
  value["type"] = json!("blogpost");
  value
}

pub fn attachment(id: &str, page_id: &str, title: &str, media_type: &str) -> Value {
  json!({
    "id": id,
    "type": "attachment",
    "status": "current",
    "title": title,
    "metadata": {"mediaType": media_type, "comment": ""},
    "extensions": {"mediaType": media_type, "fileSize": 2048},
    "_links": {
      "download": download_path(page_id, title),
      "webui": format!("/pages/viewpageattachments.action?pageId={page_id}")
    }
  })
}

pub fn download_path(page_id: &str, title: &str) -> String {
  format!("/download/attachments/{page_id}/{title}?version=1&api=v2")
}

/// Answer of the OpenAI chat completions endpoint.
pub fn openai_answer(text: &str) -> Value {
  json!({
    "id": "chatcmpl-1",
    "object": "chat.completion",
    "model": "gpt-4o",
    "choices": [{
      "index": 0,
      "message": {"role": "assistant", "content": text},
      "finish_reason": "stop"
    }],
    "usage": {"prompt_tokens": 812, "completion_tokens": 14, "total_tokens": 826}
  })
}

/// First bytes of a PNG file.
pub const PNG_BYTES: &[u8] = b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR";
