pub mod private;
pub mod public;

pub use private::BitbankClient;
pub use public::PublicClient;

use serde::de::DeserializeOwned;
use serde::Deserialize;

use common::{Error, Result};

/// Every bitbank response is wrapped as `{"success": 1, "data": {...}}`.
/// On failure `success` is 0 and `data.code` carries the error code.
#[derive(Deserialize)]
struct Envelope {
    success: u8,
    data: serde_json::Value,
}

fn unwrap_envelope<T: DeserializeOwned>(body: &str) -> Result<T> {
    let envelope: Envelope = serde_json::from_str(body)?;
    if envelope.success != 1 {
        let code = envelope
            .data
            .get("code")
            .map(|c| c.to_string())
            .unwrap_or_else(|| "unknown".to_string());
        return Err(Error::Exchange(format!("bitbank error code {code}")));
    }
    Ok(serde_json::from_value(envelope.data)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Deserialize)]
    struct Ticker {
        last: String,
    }

    #[test]
    fn success_envelope_yields_data() {
        let ticker: Ticker =
            unwrap_envelope(r#"{"success":1,"data":{"last":"15350001"}}"#).unwrap();
        assert_eq!(ticker.last, "15350001");
    }

    #[test]
    fn failure_envelope_reports_code() {
        let err = unwrap_envelope::<Ticker>(r#"{"success":0,"data":{"code":20001}}"#).unwrap_err();
        assert!(err.to_string().contains("20001"), "{err}");
    }
}
