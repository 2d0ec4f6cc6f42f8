use std::sync::Arc;

use serde::de::DeserializeOwned;

use crate::client::{ClientError, Resource};
use crate::domain::PaginatedResult;
use crate::hooks::{HookContext, HookListener, HookState, ListHook, use_list};

use super::controller::{ControllerListener, ListController};

/// Wires a [`ListController`] to a list hook.
///
/// Accepted transitions push the new query into the hook; results the hook
/// receives feed [`ListController::observe`]. Both bindings hold weak handles,
/// so dropping the view releases them.
pub struct ListView<T>
where
    T: DeserializeOwned + Send + Sync + 'static,
{
    controller: ListController,
    hook: ListHook<T>,
    _query_binding: ControllerListener,
    _result_binding: HookListener,
}

impl<T> ListView<T>
where
    T: DeserializeOwned + Send + Sync + 'static,
{
    /// Mounts a hook for `resource` at the controller's current query.
    pub fn mount(ctx: &HookContext, resource: Resource, controller: ListController) -> Self {
        let hook = use_list(ctx, resource, controller.query());
        Self::bind(controller, hook)
    }

    pub fn bind(controller: ListController, hook: ListHook<T>) -> Self {
        hook.set_query(controller.query());

        let target = hook.downgrade();
        let query_binding = controller.on_change(move |query| {
            if let Some(hook) = target.upgrade() {
                hook.set_query(query.clone());
            }
        });

        let observer = controller.downgrade();
        let result_binding = hook.on_change(move |state: &HookState<PaginatedResult<T>>| {
            if let (Some(controller), Some(data)) = (observer.upgrade(), &state.data) {
                controller.observe(data.as_ref());
            }
        });

        if let Some(data) = hook.state().data {
            controller.observe(data.as_ref());
        }

        Self {
            controller,
            hook,
            _query_binding: query_binding,
            _result_binding: result_binding,
        }
    }

    pub fn controller(&self) -> &ListController {
        &self.controller
    }

    pub fn hook(&self) -> &ListHook<T> {
        &self.hook
    }

    pub fn state(&self) -> HookState<PaginatedResult<T>> {
        self.hook.state()
    }

    /// Awaits the current page, recording its pagination on the controller.
    pub async fn resolve(&self) -> Result<Arc<PaginatedResult<T>>, ClientError> {
        let result = self.hook.resolve().await?;
        self.controller.observe(result.as_ref());
        Ok(result)
    }
}
