pub mod test_helpers {
    use crate::refine::{RewriteError, RewriteRequest, RewriteService};
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Rewrite service fed from a script of canned outcomes, consumed in
    /// order. Records every request it sees; running past the end of the
    /// script fails the call, so over-calling shows up in tests.
    pub struct ScriptedRewriteService {
        responses: Mutex<VecDeque<Result<String, RewriteError>>>,
        calls: AtomicUsize,
        requests: Mutex<Vec<RewriteRequest>>,
    }

    impl ScriptedRewriteService {
        pub fn new() -> Self {
            Self {
                responses: Mutex::new(VecDeque::new()),
                calls: AtomicUsize::new(0),
                requests: Mutex::new(Vec::new()),
            }
        }

        /// Queue a successful rewrite returning `content`.
        pub fn respond_with(self, content: &str) -> Self {
            self.responses
                .lock()
                .unwrap()
                .push_back(Ok(content.to_string()));
            self
        }

        /// Queue a transport failure with the given message.
        pub fn fail_with(self, message: &str) -> Self {
            self.responses
                .lock()
                .unwrap()
                .push_back(Err(RewriteError::Transport(message.to_string())));
            self
        }

        pub fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        pub fn last_request(&self) -> Option<RewriteRequest> {
            self.requests.lock().unwrap().last().cloned()
        }
    }

    impl Default for ScriptedRewriteService {
        fn default() -> Self {
            Self::new()
        }
    }

    #[async_trait::async_trait]
    impl RewriteService for ScriptedRewriteService {
        async fn rewrite(&self, request: &RewriteRequest) -> Result<String, RewriteError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.requests.lock().unwrap().push(request.clone());
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| {
                    Err(RewriteError::Transport(
                        "no scripted response left".to_string(),
                    ))
                })
        }
    }
}
