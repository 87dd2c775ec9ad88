// --- File: crates/connect_stripe/src/forms.rs ---
//! Request bodies for create/update/submit operations.
//!
//! HTML forms post `application/x-www-form-urlencoded` or, when they carry a
//! verification document, `multipart/form-data`. API clients may send JSON.
//! All three end up as the same flat name → value map.

use axum::{
    extract::{FromRequest, Multipart, Request},
    http::header::CONTENT_TYPE,
    Form, Json,
};
use connect_common::{validation_error, DashboardError};
use std::collections::BTreeMap;

use crate::models::FileUpload;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FormSubmission {
    pub fields: BTreeMap<String, String>,
    pub uploads: BTreeMap<String, FileUpload>,
}

impl FormSubmission {
    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields
            .get(name)
            .map(|value| value.trim())
            .filter(|value| !value.is_empty())
    }

    pub fn from_pairs<'a>(pairs: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        FormSubmission {
            fields: pairs
                .into_iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            uploads: BTreeMap::new(),
        }
    }
}

fn json_to_text(value: serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::Null => None,
        serde_json::Value::String(text) => Some(text),
        other => Some(other.to_string()),
    }
}

async fn read_multipart(mut multipart: Multipart) -> Result<FormSubmission, DashboardError> {
    let mut submission = FormSubmission::default();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| validation_error(e.body_text()))?
    {
        let Some(name) = field.name().map(str::to_string) else {
            continue;
        };
        match field.file_name().map(str::to_string) {
            Some(file_name) if !file_name.is_empty() => {
                let content_type = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_string();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| validation_error(e.body_text()))?;
                // Browsers send an empty part for an untouched file input.
                if !bytes.is_empty() {
                    submission.uploads.insert(
                        name.clone(),
                        FileUpload {
                            field: name,
                            file_name,
                            content_type,
                            bytes: bytes.to_vec(),
                        },
                    );
                }
            }
            _ => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| validation_error(e.body_text()))?;
                submission.fields.insert(name, text);
            }
        }
    }
    Ok(submission)
}

impl<S> FromRequest<S> for FormSubmission
where
    S: Send + Sync,
{
    type Rejection = DashboardError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let content_type = req
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default()
            .to_ascii_lowercase();

        if content_type.starts_with("multipart/form-data") {
            let multipart = Multipart::from_request(req, state)
                .await
                .map_err(|e| validation_error(e.body_text()))?;
            read_multipart(multipart).await
        } else if content_type.starts_with("application/x-www-form-urlencoded") {
            let Form(pairs) = Form::<Vec<(String, String)>>::from_request(req, state)
                .await
                .map_err(|e| validation_error(e.body_text()))?;
            Ok(FormSubmission {
                fields: pairs.into_iter().collect(),
                uploads: BTreeMap::new(),
            })
        } else if content_type.starts_with("application/json") {
            let Json(body) =
                Json::<BTreeMap<String, serde_json::Value>>::from_request(req, state)
                    .await
                    .map_err(|e| validation_error(e.body_text()))?;
            Ok(FormSubmission {
                fields: body
                    .into_iter()
                    .filter_map(|(k, v)| json_to_text(v).map(|text| (k, text)))
                    .collect(),
                uploads: BTreeMap::new(),
            })
        } else {
            // Bodiless PATCH/DELETE calls from API clients.
            Ok(FormSubmission::default())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;

    async fn submission(content_type: &str, body: &'static str) -> FormSubmission {
        let request = Request::builder()
            .method("POST")
            .uri("/")
            .header(CONTENT_TYPE, content_type)
            .body(Body::from(body))
            .unwrap();
        FormSubmission::from_request(request, &()).await.unwrap()
    }

    #[tokio::test]
    async fn test_urlencoded_body() {
        let form = submission(
            "application/x-www-form-urlencoded",
            "company_name=Beispiel+GmbH&company_vat_id=",
        )
        .await;
        assert_eq!(form.get("company_name"), Some("Beispiel GmbH"));
        assert_eq!(form.get("company_vat_id"), None);
    }

    #[tokio::test]
    async fn test_json_body() {
        let form = submission(
            "application/json",
            r#"{"type":"company","dob_day":7,"email":null}"#,
        )
        .await;
        assert_eq!(form.get("type"), Some("company"));
        assert_eq!(form.get("dob_day"), Some("7"));
        assert!(!form.fields.contains_key("email"));
    }

    #[tokio::test]
    async fn test_multipart_body_with_file() {
        let body = "--XYZ\r\n\
Content-Disposition: form-data; name=\"first_name\"\r\n\r\n\
Ada\r\n\
--XYZ\r\n\
Content-Disposition: form-data; name=\"verification_document_front\"; filename=\"id.png\"\r\n\
Content-Type: image/png\r\n\r\n\
PNGDATA\r\n\
--XYZ\r\n\
Content-Disposition: form-data; name=\"verification_document_back\"; filename=\"\"\r\n\
Content-Type: application/octet-stream\r\n\r\n\
\r\n\
--XYZ--\r\n";
        let form = submission("multipart/form-data; boundary=XYZ", body).await;
        assert_eq!(form.get("first_name"), Some("Ada"));
        let upload = form.uploads.get("verification_document_front").unwrap();
        assert_eq!(upload.file_name, "id.png");
        assert_eq!(upload.content_type, "image/png");
        assert_eq!(upload.bytes, b"PNGDATA".to_vec());
        assert!(!form.uploads.contains_key("verification_document_back"));
    }

    #[tokio::test]
    async fn test_missing_body() {
        let request = Request::builder()
            .method("DELETE")
            .uri("/")
            .body(Body::empty())
            .unwrap();
        let form = FormSubmission::from_request(request, &()).await.unwrap();
        assert_eq!(form, FormSubmission::default());
    }
}
