use std::io;

use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct JsonClonePart {
    pub(crate) path: String,
    pub(crate) start_block: u32,
    pub(crate) start_line: u32,
    pub(crate) end_line: u32,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct JsonCloneGroup {
    pub(crate) length_in_blocks: u32,
    pub(crate) parts: Vec<JsonClonePart>,
}

pub(crate) fn write_json<T: Serialize>(value: &T) -> io::Result<()> {
    let json = serde_json::to_string_pretty(value)
        .map_err(|e| io::Error::new(io::ErrorKind::Other, format!("json encode: {e}")))?;
    println!("{json}");
    Ok(())
}
