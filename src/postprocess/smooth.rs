use crate::types::DecisionMatrix;

/// Suppress decision runs shorter than `min_run_frames`, per class track.
///
/// One left-to-right pass over the run-length encoding of each track: an
/// interior run shorter than the minimum is absorbed into the context to
/// its left (classifier jitter rather than a real class change); runs
/// touching either sequence boundary keep their original value, since one
/// side has no context to absorb them into. The pass reaches a fixed
/// point: smoothing an already smoothed track changes nothing.
pub fn smooth_decisions(decisions: &mut DecisionMatrix, min_run_frames: usize) {
    if min_run_frames <= 1 {
        return;
    }
    for mut track in decisions.columns_mut() {
        let mut frames: Vec<bool> = track.iter().copied().collect();
        smooth_track(&mut frames, min_run_frames);
        for (slot, value) in track.iter_mut().zip(frames) {
            *slot = value;
        }
    }
}

fn smooth_track(frames: &mut [bool], min_run_frames: usize) {
    let runs = encode_runs(frames);
    if runs.len() < 3 {
        return;
    }
    let last = runs.len() - 1;
    let mut merged: Vec<(bool, usize)> = Vec::with_capacity(runs.len());
    for (idx, &(value, len)) in runs.iter().enumerate() {
        let interior = idx != 0 && idx != last;
        let value = match merged.last() {
            Some(&(context, _)) if interior && len < min_run_frames => context,
            _ => value,
        };
        match merged.last_mut() {
            Some((prev, prev_len)) if *prev == value => *prev_len += len,
            _ => merged.push((value, len)),
        }
    }
    let mut cursor = 0usize;
    for (value, len) in merged {
        frames[cursor..cursor + len].fill(value);
        cursor += len;
    }
}

fn encode_runs(frames: &[bool]) -> Vec<(bool, usize)> {
    let mut runs: Vec<(bool, usize)> = Vec::new();
    for &value in frames {
        match runs.last_mut() {
            Some((prev, len)) if *prev == value => *len += 1,
            _ => runs.push((value, 1)),
        }
    }
    runs
}
