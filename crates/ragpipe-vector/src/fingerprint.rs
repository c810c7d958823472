use blake3::Hasher;

use ragpipe_core::types::Chunk;

/// blake3 digest of the model id and every chunk's `(chunk_id, text)`, in order.
///
/// Fields are length-prefixed so that shifting bytes between neighbouring
/// fields changes the digest.
pub fn build_fingerprint(model_id: &str, chunks: &[Chunk]) -> String {
    let mut hasher = Hasher::new();
    update_field(&mut hasher, model_id);
    hasher.update(&(chunks.len() as u64).to_le_bytes());
    for chunk in chunks {
        update_field(&mut hasher, &chunk.chunk_id);
        update_field(&mut hasher, &chunk.text);
    }
    hasher.finalize().to_hex().to_string()
}

fn update_field(hasher: &mut Hasher, field: &str) {
    hasher.update(&(field.len() as u64).to_le_bytes());
    hasher.update(field.as_bytes());
}
