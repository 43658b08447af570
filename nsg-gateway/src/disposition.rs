//! File name extraction from a content-disposition style header
//!
//! Upload transports call [`file_name`] on the header of the uploaded part;
//! `nsg put --disposition` does the same.

/// Name used when the header carries no `filename` parameter
pub const UNKNOWN_FILE_NAME: &str = "unknown";

/// Pull the file name out of e.g. `form-data; name="file"; filename="a.txt"`.
pub fn file_name(header: Option<&str>) -> String {
    let Some(header) = header else {
        return UNKNOWN_FILE_NAME.to_string();
    };
    header
        .split(';')
        .find(|token| token.trim().starts_with("filename"))
        .map(|token| {
            let value = token.split_once('=').map(|(_, v)| v).unwrap_or(token);
            value.trim().replace('"', "")
        })
        .unwrap_or_else(|| UNKNOWN_FILE_NAME.to_string())
}
