//! `POST /predict`: validate the symptom list, run the executor, relay its JSON.

use actix_web::{error::JsonPayloadError, web, HttpRequest, HttpResponse};
use log::{error, warn};
use serde_json::Value;

use crate::execution::{PredictionError, PredictionExecutor};

/// Pull `symptoms` out of a request body. Only the shape is checked: it must be
/// present and an array; element types and length are left to the script.
pub fn symptoms_from_body(body: &Value) -> Result<&[Value], PredictionError> {
    body.get("symptoms")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .ok_or(PredictionError::InvalidInput)
}

pub async fn predict(
    executor: web::Data<dyn PredictionExecutor>,
    body: web::Json<Value>,
) -> Result<HttpResponse, PredictionError> {
    let symptoms = symptoms_from_body(&body).inspect_err(|_| {
        warn!("rejected request: missing or non-array `symptoms`");
    })?;

    match executor.predict(symptoms).await {
        Ok(prediction) => Ok(HttpResponse::Ok().json(prediction)),
        Err(e) => {
            match &e {
                PredictionError::Execution(cause) => error!("prediction failed: {}", cause),
                PredictionError::Output(cause) => error!("prediction output rejected: {}", cause),
                PredictionError::InvalidInput => {}
            }
            Err(e)
        }
    }
}

/// Body that is not JSON (or too large) is reported the same way as a bad
/// `symptoms` field.
pub fn json_error_handler(err: JsonPayloadError, _req: &HttpRequest) -> actix_web::Error {
    warn!("rejected request body: {}", err);
    PredictionError::InvalidInput.into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn accepts_any_array() {
        let body = json!({ "symptoms": ["fever", 3, null] });
        assert_eq!(symptoms_from_body(&body).unwrap().len(), 3);

        let empty = json!({ "symptoms": [] });
        assert!(symptoms_from_body(&empty).unwrap().is_empty());
    }

    #[test]
    fn rejects_missing_or_non_array() {
        for body in [
            json!({}),
            json!({ "symptoms": null }),
            json!({ "symptoms": "fever" }),
            json!({ "symptoms": { "0": "fever" } }),
            json!({ "Symptoms": ["fever"] }),
            json!(["fever"]),
            json!("symptoms"),
        ] {
            assert!(
                matches!(symptoms_from_body(&body), Err(PredictionError::InvalidInput)),
                "accepted {body}"
            );
        }
    }
}
