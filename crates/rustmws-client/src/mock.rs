//! Offline response harness.
//!
//! Queued fixtures are served in order. The last one is sticky: once a single
//! fixture remains it is returned for every further call instead of being
//! removed, so a one-fixture harness answers any number of requests. An empty
//! queue fails with [`MwsError::MockExhausted`].

use std::collections::VecDeque;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::error::{MwsError, MwsResult};
use crate::executor::SignedRequest;

#[derive(Debug, Clone, PartialEq, Eq)]
enum FixtureBody {
    File(PathBuf),
    Inline(String),
}

/// One canned response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockFixture {
    name: String,
    body: FixtureBody,
    status: u16,
}

impl MockFixture {
    /// Fixture read from a file, relative to the harness fixture directory.
    #[must_use]
    pub fn file(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            body: FixtureBody::File(PathBuf::from(&name)),
            name,
            status: 200,
        }
    }

    /// Fixture with an in-memory body.
    #[must_use]
    pub fn inline(name: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            body: FixtureBody::Inline(body.into()),
            status: 200,
        }
    }

    /// Override the HTTP status (default 200).
    #[must_use]
    pub fn with_status(mut self, status: u16) -> Self {
        self.status = status;
        self
    }

    /// Fixture name, used in logs and [`MockHarness::consumed`].
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// HTTP status the fixture answers with.
    #[must_use]
    pub fn status(&self) -> u16 {
        self.status
    }
}

/// A fixture resolved to its body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockResponse {
    /// Fixture name.
    pub name: String,
    /// HTTP status.
    pub status: u16,
    /// Response body.
    pub body: String,
}

/// FIFO of fixtures plus a record of what was asked of it.
#[derive(Debug, Default)]
pub struct MockHarness {
    fixture_dir: Option<PathBuf>,
    queue: VecDeque<MockFixture>,
    consumed: Vec<String>,
    requests: Vec<SignedRequest>,
}

impl MockHarness {
    /// Create an empty harness.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty harness that resolves file fixtures against `dir`.
    #[must_use]
    pub fn with_fixture_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            fixture_dir: Some(dir.into()),
            ..Self::default()
        }
    }

    /// Queue a fixture.
    pub fn push(&mut self, fixture: MockFixture) -> &mut Self {
        self.queue.push_back(fixture);
        self
    }

    /// Queue a fixture, builder style.
    #[must_use]
    pub fn with(mut self, fixture: MockFixture) -> Self {
        self.push(fixture);
        self
    }

    /// Queue several fixtures in order.
    pub fn extend(&mut self, fixtures: impl IntoIterator<Item = MockFixture>) -> &mut Self {
        self.queue.extend(fixtures);
        self
    }

    /// Fixtures still queued.
    #[must_use]
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    /// Whether the queue is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Directory file fixtures are resolved against.
    #[must_use]
    pub fn fixture_dir(&self) -> Option<&Path> {
        self.fixture_dir.as_deref()
    }

    /// Serve the next fixture.
    ///
    /// # Errors
    ///
    /// Returns [`MwsError::MockExhausted`] when nothing is queued and
    /// [`MwsError::MockFixture`] when a file fixture cannot be read.
    pub async fn next_response(&mut self) -> MwsResult<MockResponse> {
        let fixture = self.queue.front().ok_or(MwsError::MockExhausted)?;

        let body = match &fixture.body {
            FixtureBody::Inline(body) => body.clone(),
            FixtureBody::File(path) => {
                let path = self.resolve(path);
                tokio::fs::read_to_string(&path)
                    .await
                    .map_err(|source| MwsError::MockFixture {
                        name: fixture.name.clone(),
                        source,
                    })?
            }
        };

        // The last fixture stays queued.
        let fixture = if self.queue.len() > 1 {
            self.queue.pop_front()
        } else {
            self.queue.front().cloned()
        }
        .ok_or(MwsError::MockExhausted)?;

        info!(
            fixture = %fixture.name,
            status = fixture.status,
            remaining = self.queue.len(),
            "Serving mock response"
        );
        self.consumed.push(fixture.name.clone());

        Ok(MockResponse {
            name: fixture.name,
            status: fixture.status,
            body,
        })
    }

    /// Names of the fixtures served so far, in order.
    #[must_use]
    pub fn consumed(&self) -> &[String] {
        &self.consumed
    }

    /// Signed requests this harness answered, in order.
    #[must_use]
    pub fn requests(&self) -> &[SignedRequest] {
        &self.requests
    }

    /// Drop queued fixtures and recorded history.
    pub fn clear(&mut self) {
        self.queue.clear();
        self.consumed.clear();
        self.requests.clear();
    }

    pub(crate) fn record(&mut self, request: SignedRequest) {
        self.requests.push(request);
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        match &self.fixture_dir {
            Some(dir) if path.is_relative() => dir.join(path),
            _ => path.to_path_buf(),
        }
    }
}
