//! 请求体解析与图片解码
use base64::{
    Engine as _, alphabet,
    engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig},
};
use image::ImageFormat;
use serde_json::Value;

use super::models::{ImagePayload, UploadFile};
use crate::config::UploadConfig;
use crate::error::AppError;

/// 宽松解码：填充可有可无，容忍末尾多余比特（浏览器 canvas 导出的数据偶尔不规范）
const LENIENT: GeneralPurposeConfig = GeneralPurposeConfig::new()
    .with_decode_allow_trailing_bits(true)
    .with_decode_padding_mode(DecodePaddingMode::Indifferent);
const STANDARD_LENIENT: GeneralPurpose = GeneralPurpose::new(&alphabet::STANDARD, LENIENT);
const URL_SAFE_LENIENT: GeneralPurpose = GeneralPurpose::new(&alphabet::URL_SAFE, LENIENT);

const IMAGE_DATA_FIELD: &str = "imageData";

/// 从请求体中取出 `imageData` 字符串。
///
/// 请求体可以是 JSON 对象，也可以是“被序列化成 JSON 字符串的 JSON 对象”，后者先解析一次内层。
pub fn extract_image_data(body: &[u8]) -> Result<String, AppError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Err(AppError::MissingImageData { received: "empty" });
    }

    let value: Value =
        serde_json::from_slice(body).map_err(|e| AppError::MalformedBody(e.to_string()))?;

    let (received, value) = match value {
        Value::String(inner) => {
            let parsed: Value = serde_json::from_str(&inner)
                .map_err(|e| AppError::MalformedBody(e.to_string()))?;
            ("string", parsed)
        }
        other => (json_kind(&other), other),
    };

    let Value::Object(mut map) = value else {
        return Err(AppError::MissingImageData { received });
    };

    match map.remove(IMAGE_DATA_FIELD) {
        Some(Value::String(s)) if !s.trim().is_empty() => Ok(s),
        None | Some(Value::Null) | Some(Value::String(_)) => {
            Err(AppError::MissingImageData { received })
        }
        Some(other) => Err(AppError::InvalidImageData(format!(
            "imageData must be a string, got {}",
            json_kind(&other)
        ))),
    }
}

/// 去掉可选的 data URI 前缀并解码 base64。
pub fn decode_image_data(raw: &str) -> Result<ImagePayload, AppError> {
    let (declared_mime, data) = split_data_uri(raw.trim());
    let cleaned: String = data.chars().filter(|c| !c.is_ascii_whitespace()).collect();

    let bytes = STANDARD_LENIENT
        .decode(cleaned.as_bytes())
        .or_else(|_| URL_SAFE_LENIENT.decode(cleaned.as_bytes()))
        .map_err(|e| AppError::InvalidImageData(format!("imageData is not valid base64: {e}")))?;

    if bytes.is_empty() {
        return Err(AppError::InvalidImageData(
            "imageData decoded to zero bytes".to_string(),
        ));
    }

    Ok(ImagePayload {
        bytes,
        declared_mime,
    })
}

/// 决定上传文件名与 Content-Type：魔数嗅探 > data URI 声明 > 配置默认值
pub fn upload_file_for(payload: &ImagePayload, defaults: &UploadConfig) -> UploadFile {
    let format = image::guess_format(&payload.bytes).ok().or_else(|| {
        payload
            .declared_mime
            .as_deref()
            .and_then(ImageFormat::from_mime_type)
    });

    match format.and_then(|f| f.extensions_str().first().map(|ext| (f, *ext))) {
        Some((f, ext)) => UploadFile {
            file_name: format!("image.{ext}"),
            content_type: f.to_mime_type().to_string(),
        },
        None => UploadFile {
            file_name: defaults.default_file_name.clone(),
            content_type: defaults.default_content_type.clone(),
        },
    }
}

/// 拆分 `data:<mime>;base64,<data>`；非 base64 形式的 data URI 原样返回，交给解码报错
fn split_data_uri(input: &str) -> (Option<String>, &str) {
    let Some(rest) = input
        .get(..5)
        .filter(|p| p.eq_ignore_ascii_case("data:"))
        .map(|_| &input[5..])
    else {
        return (None, input);
    };
    let Some((meta, data)) = rest.split_once(',') else {
        return (None, input);
    };

    let mut parts = meta.split(';');
    let mime = parts.next().unwrap_or("").trim();
    if !parts.any(|p| p.trim().eq_ignore_ascii_case("base64")) {
        return (None, input);
    }

    let mime = (!mime.is_empty()).then(|| mime.to_ascii_lowercase());
    (mime, data)
}

fn json_kind(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::engine::general_purpose;

    const PNG_SIGNATURE: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

    #[test]
    fn extracts_from_object_body() {
        let body = br#"{"imageData":"aGVsbG8="}"#;
        assert_eq!(extract_image_data(body).unwrap(), "aGVsbG8=");
    }

    #[test]
    fn extracts_from_double_serialized_body() {
        let inner = r#"{"imageData":"aGVsbG8="}"#;
        let body = serde_json::to_vec(&serde_json::Value::String(inner.into())).unwrap();
        assert_eq!(extract_image_data(&body).unwrap(), "aGVsbG8=");
    }

    #[test]
    fn missing_or_empty_image_data_reports_received_kind() {
        let cases: [(&[u8], &str); 5] = [
            (b"", "empty"),
            (b"{}", "object"),
            (br#"{"imageData":"   "}"#, "object"),
            (br#"[1,2]"#, "array"),
            (br#""{\"other\":1}""#, "string"),
        ];
        for (body, kind) in cases {
            match extract_image_data(body) {
                Err(AppError::MissingImageData { received }) => assert_eq!(received, kind),
                other => panic!("unexpected result for {body:?}: {other:?}"),
            }
        }
    }

    #[test]
    fn malformed_json_is_reported_as_malformed_body() {
        assert!(matches!(
            extract_image_data(b"{imageData:"),
            Err(AppError::MalformedBody(_))
        ));
        assert!(matches!(
            extract_image_data(br#""not json inside""#),
            Err(AppError::MalformedBody(_))
        ));
    }

    #[test]
    fn non_string_image_data_is_invalid() {
        assert!(matches!(
            extract_image_data(br#"{"imageData":42}"#),
            Err(AppError::InvalidImageData(_))
        ));
    }

    #[test]
    fn data_uri_and_raw_base64_decode_to_same_bytes() {
        let original: Vec<u8> = (0u8..=255).cycle().take(1000).collect();
        let encoded = general_purpose::STANDARD.encode(&original);

        let raw = decode_image_data(&encoded).unwrap();
        assert_eq!(raw.bytes, original);
        assert!(raw.declared_mime.is_none());

        let uri = decode_image_data(&format!("data:image/png;base64,{encoded}")).unwrap();
        assert_eq!(uri.bytes, original);
        assert_eq!(uri.declared_mime.as_deref(), Some("image/png"));
    }

    #[test]
    fn decodes_unpadded_url_safe_and_wrapped_input() {
        let original = b"\xfb\xff\xfe binary?";
        let url_safe = general_purpose::URL_SAFE_NO_PAD.encode(original);
        assert_eq!(decode_image_data(&url_safe).unwrap().bytes, original);

        let standard = general_purpose::STANDARD.encode(original);
        let wrapped = format!("{}\n{}", &standard[..8], &standard[8..]);
        assert_eq!(decode_image_data(&wrapped).unwrap().bytes, original);
    }

    #[test]
    fn data_uri_prefix_is_case_insensitive_and_keeps_subtype() {
        let p = decode_image_data("DATA:image/svg+xml;base64,PHN2Zy8+").unwrap();
        assert_eq!(p.bytes, b"<svg/>");
        assert_eq!(p.declared_mime.as_deref(), Some("image/svg+xml"));
    }

    #[test]
    fn rejects_invalid_and_empty_payloads() {
        assert!(matches!(
            decode_image_data("data:image/png,notbase64"),
            Err(AppError::InvalidImageData(_))
        ));
        assert!(matches!(
            decode_image_data("data:image/png;base64,"),
            Err(AppError::InvalidImageData(_))
        ));
        assert!(matches!(
            decode_image_data("!!!"),
            Err(AppError::InvalidImageData(_))
        ));
    }

    #[test]
    fn unpadded_png_signature_decodes() {
        let p = decode_image_data("data:image/png;base64,iVBORw0KGgo").unwrap();
        assert_eq!(p.bytes, PNG_SIGNATURE);
    }

    #[test]
    fn upload_file_prefers_sniffed_format() {
        let defaults = UploadConfig::default();
        let payload = ImagePayload {
            bytes: vec![0xFF, 0xD8, 0xFF, 0xE0, 0, 0, 0, 0],
            declared_mime: Some("image/png".into()),
        };
        let file = upload_file_for(&payload, &defaults);
        assert_eq!(file.content_type, "image/jpeg");
        assert_eq!(file.file_name, "image.jpg");
    }

    #[test]
    fn upload_file_falls_back_to_declared_then_defaults() {
        let defaults = UploadConfig::default();

        let declared = ImagePayload {
            bytes: b"not an image".to_vec(),
            declared_mime: Some("image/webp".into()),
        };
        let file = upload_file_for(&declared, &defaults);
        assert_eq!(file.file_name, "image.webp");
        assert_eq!(file.content_type, "image/webp");

        let unknown = ImagePayload {
            bytes: b"not an image".to_vec(),
            declared_mime: None,
        };
        let file = upload_file_for(&unknown, &defaults);
        assert_eq!(file.file_name, "image.png");
        assert_eq!(file.content_type, "image/png");
    }
}
