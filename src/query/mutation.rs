//! Mutation runner with an explicit hook lifecycle.
//!
//! Wraps one async write operation in ordered hooks: `on_mutate` first, then
//! the operation, then exactly one of `on_success`/`on_error`, then
//! `on_settled`. The run returns a [`MutationOutcome`] so the caller reads
//! the created value from the result instead of smuggling it out through a
//! hook.

use std::future::Future;

use crate::api::ApiError;

type MutateHook<V, C> = Box<dyn FnMut(&V) -> C>;
type SuccessHook<T, V, C> = Box<dyn FnMut(&T, &V, &C)>;
type ErrorHook<V, C> = Box<dyn FnMut(&ApiError, &V, &C)>;
type SettledHook<T, V, C> = Box<dyn FnMut(Option<&T>, Option<&ApiError>, &V, &C)>;

/// One write operation's hook set.
///
/// `V` is the variables handed to the operation, `T` the success value, `C`
/// a context produced by `on_mutate` and passed to every later hook.
pub struct Mutation<V, T, C = ()> {
    on_mutate: Option<MutateHook<V, C>>,
    on_success: Option<SuccessHook<T, V, C>>,
    on_error: Option<ErrorHook<V, C>>,
    on_settled: Option<SettledHook<T, V, C>>,
}

impl<V, T, C> Mutation<V, T, C> {
    pub fn new() -> Self {
        Self {
            on_mutate: None,
            on_success: None,
            on_error: None,
            on_settled: None,
        }
    }

    /// Runs before the operation; its return value becomes the context.
    pub fn on_mutate(mut self, hook: impl FnMut(&V) -> C + 'static) -> Self {
        self.on_mutate = Some(Box::new(hook));
        self
    }

    pub fn on_success(mut self, hook: impl FnMut(&T, &V, &C) + 'static) -> Self {
        self.on_success = Some(Box::new(hook));
        self
    }

    pub fn on_error(mut self, hook: impl FnMut(&ApiError, &V, &C) + 'static) -> Self {
        self.on_error = Some(Box::new(hook));
        self
    }

    /// Runs last on both paths, with whichever of value/error applies.
    pub fn on_settled(
        mut self,
        hook: impl FnMut(Option<&T>, Option<&ApiError>, &V, &C) + 'static,
    ) -> Self {
        self.on_settled = Some(Box::new(hook));
        self
    }
}

impl<V, T, C> Default for Mutation<V, T, C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V, T, C> Mutation<V, T, C>
where
    V: Clone,
    C: Default,
{
    /// Run the operation through the full hook lifecycle.
    pub async fn run<M, Fut>(&mut self, vars: V, mutate: M) -> MutationOutcome<T, C>
    where
        M: FnOnce(V) -> Fut,
        Fut: Future<Output = Result<T, ApiError>>,
    {
        let context = match self.on_mutate.as_mut() {
            Some(hook) => hook(&vars),
            None => C::default(),
        };

        match mutate(vars.clone()).await {
            Ok(value) => {
                if let Some(hook) = self.on_success.as_mut() {
                    hook(&value, &vars, &context);
                }
                if let Some(hook) = self.on_settled.as_mut() {
                    hook(Some(&value), None, &vars, &context);
                }
                MutationOutcome {
                    state: MutationState::Success(value),
                    context,
                }
            }
            Err(error) => {
                if let Some(hook) = self.on_error.as_mut() {
                    hook(&error, &vars, &context);
                }
                if let Some(hook) = self.on_settled.as_mut() {
                    hook(None, Some(&error), &vars, &context);
                }
                MutationOutcome {
                    state: MutationState::Error(error),
                    context,
                }
            }
        }
    }
}

/// Result of one mutation run.
#[derive(Debug)]
pub struct MutationOutcome<T, C = ()> {
    pub state: MutationState<T>,
    pub context: C,
}

#[derive(Debug)]
pub enum MutationState<T> {
    Success(T),
    Error(ApiError),
}

impl<T, C> MutationOutcome<T, C> {
    pub fn success(&self) -> Option<&T> {
        match &self.state {
            MutationState::Success(value) => Some(value),
            MutationState::Error(_) => None,
        }
    }

    pub fn error(&self) -> Option<&ApiError> {
        match &self.state {
            MutationState::Success(_) => None,
            MutationState::Error(error) => Some(error),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self.state, MutationState::Success(_))
    }
}
