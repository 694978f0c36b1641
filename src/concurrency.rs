//! Concurrency helper: limit the number of videos processed in parallel.

use rayon::prelude::*;

/// Run `f` for every video id with at most `limit` in flight. Stops at the
/// first chunk containing a failure and returns that error.
pub fn for_each_video_limited<T, E, F>(video_ids: &[String], limit: usize, f: F) -> Result<Vec<T>, E>
where
    T: Send,
    E: Send,
    F: Sync + Fn(&str) -> Result<T, E>,
{
    let mut out = Vec::with_capacity(video_ids.len());
    if limit <= 1 {
        for vid in video_ids {
            out.push(f(vid)?);
        }
        return Ok(out);
    }
    for chunk in video_ids.chunks(limit) {
        let done: Vec<T> = chunk.par_iter().map(|vid| f(vid)).collect::<Result<_, E>>()?;
        out.extend(done);
    }
    Ok(out)
}
