use crate::vector::FeatureVector;

/// Cosine alignment between two sparse vectors, in `[0, 1]` for
/// non-negative weights.
///
/// Both the dot product and the norms range over the shared keys only: a
/// pair of tabs agreeing strongly on one rare token reads as aligned no
/// matter how much unrelated text each side carries. Returns 0.0 when either
/// vector is empty or nothing is shared.
pub fn cosine(a: &FeatureVector, b: &FeatureVector) -> f32 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f32;
    let mut mag_a = 0.0f32;
    let mut mag_b = 0.0f32;
    for (token, weight_a) in a.iter() {
        let weight_b = b.weight(token);
        if weight_b > 0.0 {
            dot += weight_a * weight_b;
            mag_a += weight_a * weight_a;
            mag_b += weight_b * weight_b;
        }
    }

    if mag_a == 0.0 || mag_b == 0.0 {
        0.0
    } else {
        dot / (mag_a.sqrt() * mag_b.sqrt())
    }
}

/// Fold one member vector into a cluster centroid of `size` members.
///
/// Every key in the union moves to `(prev * size + member[k]) / (size + 1)`,
/// so new tokens enter the mean and tokens the member lacks decay in
/// proportion to the cluster's weight.
pub fn centroid_update(
    centroid: &FeatureVector,
    size: usize,
    member: &FeatureVector,
) -> FeatureVector {
    let n = size as f32;
    let mut updated = FeatureVector::new();

    for (token, prev) in centroid.iter() {
        let added = member.weight(token);
        updated.set(token, (prev * n + added) / (n + 1.0));
    }
    for (token, added) in member.iter() {
        if !centroid.contains(token) {
            updated.set(token, added / (n + 1.0));
        }
    }

    updated
}

/// Divergence between two clusters: dissimilarity scaled by how balanced
/// their sizes are, so a pair of large, unrelated clusters outranks a large
/// cluster paired with a straggler.
pub fn divergence(a: &FeatureVector, b: &FeatureVector, size_a: usize, size_b: usize) -> f32 {
    let min = size_a.min(size_b) as f32;
    let mean = (size_a + size_b) as f32 / 2.0;
    let balance = min / mean.max(1.0);

    (1.0 - cosine(a, b)) * (0.5 + 0.5 * balance)
}
