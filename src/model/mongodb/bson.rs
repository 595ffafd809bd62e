use mongodb::bson::{doc, Document};

/// Filter a collection keyed by u32 `_id`s, e.g. votaciones.
pub fn u32_id_filter(id: u32) -> Document {
    doc! { "_id": id }
}
