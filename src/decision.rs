//! Approval decisions, and the sources that produce them.

use std::future::Future;
use std::io::{BufRead, Write};
use std::str::FromStr;
use std::sync::{Arc, Mutex, PoisonError};

use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;
use tracing::{debug, warn};

use crate::candidate::CandidateSummary;
use crate::console::Console;
use crate::error::FetchError;

/// The outcome of looking at one candidate.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    /// Download and keep it
    Approve,
    /// Move on to the next candidate
    Reject,
    /// Leave this category/type pair short and move to the next pair
    SkipCategory,
    /// Stop the whole run
    Quit,
}

impl FromStr for Decision {
    type Err = FetchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "y" | "yes" => Ok(Self::Approve),
            "n" | "no" => Ok(Self::Reject),
            "s" | "skip" => Ok(Self::SkipCategory),
            "q" | "quit" => Ok(Self::Quit),
            other => Err(FetchError::InvalidInput(format!(
                "{other:?} is not one of y, n, s, q"
            ))),
        }
    }
}

/// Anything that can rule on a candidate.
pub trait Decider: Send {
    /// Decide what to do with this candidate.
    fn decide(&mut self, summary: &CandidateSummary) -> impl Future<Output = Decision> + Send;
}

const RULE: &str = "============================================================";
const APPROVAL_PROMPT: &str = "Approve this image? (Y)es / (N)o / (S)kip category / (Q)uit: ";

/// Asks a human on the console. End of input counts as quit.
#[derive(Debug)]
pub struct ConsoleDecider<R, W> {
    console: Console<R, W>,
}

impl<R: BufRead + Send, W: Write + Send> ConsoleDecider<R, W> {
    /// Prompts on the given console.
    pub fn new(console: Console<R, W>) -> Self {
        Self { console }
    }

    /// Gives back the console.
    pub fn into_console(self) -> Console<R, W> {
        self.console
    }

    fn show(&mut self, summary: &CandidateSummary) -> std::io::Result<()> {
        self.console.say("")?;
        self.console.say(RULE)?;
        self.console.say(&format!(
            "{} Image {} for category: {}",
            summary.image_type.as_str().to_ascii_uppercase(),
            summary.ordinal,
            summary.category
        ))?;
        self.console
            .say(&format!("Description: {}", summary.description))?;
        self.console.say(&format!("Author: {}", summary.author))?;
        self.console.say(&format!("URL: {}", summary.url))?;
        self.console.say(RULE)
    }

    fn prompt(&mut self, summary: &CandidateSummary) -> std::io::Result<Decision> {
        self.show(summary)?;
        loop {
            let Some(answer) = self.console.ask(APPROVAL_PROMPT)? else {
                debug!("End of input while waiting for approval");
                return Ok(Decision::Quit);
            };
            match answer.parse::<Decision>() {
                Ok(decision) => return Ok(decision),
                Err(_) => self.console.say("Please enter Y, N, S, or Q")?,
            }
        }
    }
}

impl<R: BufRead + Send, W: Write + Send> Decider for ConsoleDecider<R, W> {
    async fn decide(&mut self, summary: &CandidateSummary) -> Decision {
        match self.prompt(summary) {
            Ok(decision) => decision,
            Err(err) => {
                warn!("Console error while asking for approval: {}", err);
                Decision::Quit
            }
        }
    }
}

type Policy = Box<dyn FnMut(&CandidateSummary) -> Decision + Send>;

/// Decides with a fixed policy, for unattended runs and tests.
pub struct ScriptedDecider {
    policy: Policy,
}

impl std::fmt::Debug for ScriptedDecider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScriptedDecider").finish_non_exhaustive()
    }
}

impl ScriptedDecider {
    /// Any policy closure.
    pub fn new(policy: impl FnMut(&CandidateSummary) -> Decision + Send + 'static) -> Self {
        Self {
            policy: Box::new(policy),
        }
    }

    /// Approves everything.
    pub fn approve_all() -> Self {
        Self::new(|_| Decision::Approve)
    }

    /// Approves until one image has been saved, then rejects the rest.
    pub fn approve_first() -> Self {
        Self::new(|summary| {
            if summary.approved_so_far == 0 {
                Decision::Approve
            } else {
                Decision::Reject
            }
        })
    }

    /// Replays `decisions` in order, then rejects.
    pub fn from_sequence(decisions: Vec<Decision>) -> Self {
        let mut decisions = decisions.into_iter();
        Self::new(move |_| decisions.next().unwrap_or(Decision::Reject))
    }
}

impl Decider for ScriptedDecider {
    async fn decide(&mut self, summary: &CandidateSummary) -> Decision {
        (self.policy)(summary)
    }
}

#[derive(Debug)]
struct PendingApproval {
    summary: CandidateSummary,
    reply: oneshot::Sender<Decision>,
}

/// Holds the one candidate waiting on a remote answer.
#[derive(Debug, Default)]
pub struct ApprovalQueue {
    pending: Mutex<Option<PendingApproval>>,
}

impl ApprovalQueue {
    /// The candidate waiting for an answer, if any.
    pub fn pending(&self) -> Option<CandidateSummary> {
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map(|pending| pending.summary.clone())
    }

    /// Answers the waiting candidate.
    pub fn answer(&self, decision: Decision) -> Result<(), FetchError> {
        let pending = self
            .pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
            .ok_or_else(|| FetchError::NotFound("no candidate awaiting approval".to_string()))?;
        pending
            .reply
            .send(decision)
            .map_err(|_| FetchError::Conflict("the run is no longer waiting".to_string()))
    }

    /// Drops whatever is waiting; the run sees that as a quit.
    pub fn cancel(&self) {
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
    }

    fn park(&self, summary: CandidateSummary) -> oneshot::Receiver<Decision> {
        let (reply, receiver) = oneshot::channel();
        let replaced = self
            .pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(PendingApproval { summary, reply });
        if replaced.is_some() {
            warn!("Replaced an unanswered approval request");
        }
        receiver
    }
}

/// Waits for the remote UI to answer through an [`ApprovalQueue`].
#[derive(Clone, Debug)]
pub struct RemoteDecider {
    queue: Arc<ApprovalQueue>,
}

impl RemoteDecider {
    /// Decider parking its questions on `queue`.
    pub fn new(queue: Arc<ApprovalQueue>) -> Self {
        Self { queue }
    }
}

impl Decider for RemoteDecider {
    async fn decide(&mut self, summary: &CandidateSummary) -> Decision {
        let receiver = self.queue.park(summary.clone());
        receiver.await.unwrap_or(Decision::Quit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::candidate::Candidate;
    use crate::catalog::Catalog;

    fn summary(ordinal: usize, approved_so_far: u32) -> CandidateSummary {
        let catalog = Catalog::default();
        let candidate = Candidate::new(
            "https://img.example/1.jpg",
            "a dog",
            "Jane",
            "test",
        )
        .expect("candidate");
        CandidateSummary::new(
            &candidate,
            ordinal,
            approved_so_far,
            &catalog.category("dogs").expect("dogs"),
            &catalog.image_type("real").expect("real"),
        )
    }

    #[test]
    fn parse_accepts_short_and_long_forms() {
        assert_eq!("Y".parse::<Decision>().expect("y"), Decision::Approve);
        assert_eq!("no".parse::<Decision>().expect("no"), Decision::Reject);
        assert_eq!(" S ".parse::<Decision>().expect("s"), Decision::SkipCategory);
        assert_eq!("QUIT".parse::<Decision>().expect("quit"), Decision::Quit);
        assert!("maybe".parse::<Decision>().is_err());
    }

    #[tokio::test]
    async fn console_reprompts_on_invalid_input() {
        let console = Console::new(&b"maybe\n\nS\n"[..], Vec::new());
        let mut decider = ConsoleDecider::new(console);
        assert_eq!(decider.decide(&summary(3, 0)).await, Decision::SkipCategory);
        let output = String::from_utf8(decider.into_console().into_output()).expect("utf8");
        assert!(output.contains("REAL Image 3 for category: dogs"));
        assert!(output.contains("Author: Jane"));
        assert_eq!(output.matches("Please enter Y, N, S, or Q").count(), 2);
    }

    #[tokio::test]
    async fn console_eof_means_quit() {
        let console = Console::new(&b""[..], Vec::new());
        let mut decider = ConsoleDecider::new(console);
        assert_eq!(decider.decide(&summary(1, 0)).await, Decision::Quit);
    }

    #[tokio::test]
    async fn approve_first_rejects_after_one() {
        let mut decider = ScriptedDecider::approve_first();
        assert_eq!(decider.decide(&summary(1, 0)).await, Decision::Approve);
        assert_eq!(decider.decide(&summary(2, 1)).await, Decision::Reject);
    }

    #[tokio::test]
    async fn sequence_replays_then_rejects() {
        let mut decider =
            ScriptedDecider::from_sequence(vec![Decision::Approve, Decision::Quit]);
        assert_eq!(decider.decide(&summary(1, 0)).await, Decision::Approve);
        assert_eq!(decider.decide(&summary(2, 1)).await, Decision::Quit);
        assert_eq!(decider.decide(&summary(3, 1)).await, Decision::Reject);
    }

    #[tokio::test]
    async fn remote_decider_waits_for_answer() {
        let queue = Arc::new(ApprovalQueue::default());
        let mut decider = RemoteDecider::new(queue.clone());
        let waiting = tokio::spawn(async move { decider.decide(&summary(4, 2)).await });

        let pending = loop {
            if let Some(pending) = queue.pending() {
                break pending;
            }
            tokio::task::yield_now().await;
        };
        assert_eq!(pending.ordinal, 4);
        queue.answer(Decision::Approve).expect("answer");
        assert_eq!(waiting.await.expect("join"), Decision::Approve);
        assert!(queue.pending().is_none());
        assert!(matches!(
            queue.answer(Decision::Reject),
            Err(FetchError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn cancelled_remote_approval_is_quit() {
        let queue = Arc::new(ApprovalQueue::default());
        let mut decider = RemoteDecider::new(queue.clone());
        let waiting = tokio::spawn(async move { decider.decide(&summary(1, 0)).await });
        while queue.pending().is_none() {
            tokio::task::yield_now().await;
        }
        queue.cancel();
        assert_eq!(waiting.await.expect("join"), Decision::Quit);
    }
}
