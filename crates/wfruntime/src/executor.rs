use wfcore::{Context, Data, FlowError, Result, Runnable, StateHandle, Status};

/// Run `children` in order on behalf of the container owning `state`.
///
/// Children already recorded as completed are skipped. A failing child marks
/// the container failed and its error is returned unchanged, together with
/// whatever the data bag looks like at that point. If the container gets
/// paused while a child runs (or the child itself ends up paused), the walk
/// stops after checkpointing the data; that child is not recorded as
/// completed, so a later resume re-enters it.
pub(crate) fn run_children(
    owner: &str,
    state: &StateHandle,
    children: Vec<&mut Box<dyn Runnable>>,
    start: usize,
    ctx: &mut Context,
    data: &mut Data,
) -> Result<()> {
    for child in children.into_iter().skip(start) {
        let child_id = child.id().to_string();

        if state.is_step_completed(&child_id) {
            tracing::debug!("{}: skipping completed step {}", owner, child_id);
            continue;
        }

        state.set_current_step_id(child_id.as_str());
        tracing::debug!("{}: running step {}", owner, child_id);

        if let Err(e) = child.run(ctx, data) {
            tracing::error!("{}: step {} failed: {}", owner, child_id, e);
            state.set_status(Status::Failed);
            return Err(e);
        }

        if child.is_paused() && state.status() == Status::Running {
            state.set_status(Status::Paused);
        }

        if state.status() == Status::Paused {
            state.set_data(data.clone());
            tracing::info!("{}: paused at step {}", owner, child_id);
            return Ok(());
        }

        state.add_completed_step(child_id.as_str());
        state.set_data(data.clone());
        tracing::debug!("{}: step {} completed", owner, child_id);
    }

    state.set_status(Status::Complete);
    tracing::info!("{}: completed", owner);
    Ok(())
}

/// Rebuild the data bag for a resumed run: the checkpointed data, with the
/// caller's entries laid over it.
pub(crate) fn merge_saved_data(state: &StateHandle, data: &mut Data) {
    let mut merged = state.data();
    merged.extend(data.drain());
    *data = merged;
}

/// Position to resume from: the step that was current when the run stopped,
/// or the beginning if it is no longer known.
pub(crate) fn resume_index<'a, I>(state: &StateHandle, ids: I) -> usize
where
    I: IntoIterator<Item = &'a str>,
{
    let current = state.current_step_id();
    ids.into_iter()
        .position(|id| id == current)
        .unwrap_or(0)
}

pub(crate) fn ensure_paused(state: &StateHandle) -> Result<()> {
    if state.status() != Status::Paused {
        return Err(FlowError::NotPaused);
    }
    Ok(())
}
