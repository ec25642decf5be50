//! Console flow: pick what to delete, confirm, run the deleter, summarize.

use eraser_core::{ContentKind, CoreError, DeletionReport};
use reddit_client::{ContentDeleter, DeleterConfig, UserContentApi};
use std::io::Write;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio_util::sync::CancellationToken;
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeletionScope {
    Posts,
    Comments,
    Both,
}

impl DeletionScope {
    pub fn from_choice(choice: &str) -> Option<Self> {
        match choice.trim() {
            "1" => Some(DeletionScope::Posts),
            "2" => Some(DeletionScope::Comments),
            "3" => Some(DeletionScope::Both),
            _ => None,
        }
    }

    /// Kinds to delete, posts first.
    pub fn kinds(&self) -> &'static [ContentKind] {
        match self {
            DeletionScope::Posts => &[ContentKind::Post],
            DeletionScope::Comments => &[ContentKind::Comment],
            DeletionScope::Both => &[ContentKind::Post, ContentKind::Comment],
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            DeletionScope::Posts => "posts",
            DeletionScope::Comments => "comments",
            DeletionScope::Both => "posts and comments",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    InvalidChoice,
    Declined,
    Finished(Vec<DeletionReport>),
    Cancelled(Vec<DeletionReport>),
}

pub struct Driver<'a, A: UserContentApi + ?Sized, R, W> {
    api: &'a A,
    input: R,
    output: W,
    cancel: CancellationToken,
    deleter_config: DeleterConfig,
    limit: Option<usize>,
}

impl<'a, A, R, W> Driver<'a, A, R, W>
where
    A: UserContentApi + ?Sized,
    R: AsyncBufRead + Unpin,
    W: Write,
{
    pub fn new(api: &'a A, input: R, output: W, cancel: CancellationToken) -> Self {
        Self {
            api,
            input,
            output,
            cancel,
            deleter_config: DeleterConfig::default(),
            limit: None,
        }
    }

    pub fn with_deleter_config(mut self, config: DeleterConfig) -> Self {
        self.deleter_config = config;
        self
    }

    pub fn with_limit(mut self, limit: Option<usize>) -> Self {
        self.limit = limit;
        self
    }

    pub async fn run(mut self) -> Result<RunOutcome, CoreError> {
        let user = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => None,
            user = self.api.current_user() => Some(user?),
        };
        let user = match user {
            Some(user) => user,
            None => return self.finish_cancelled(&[], Vec::new()),
        };
        info!("Authenticated as u/{}", user.name);

        writeln!(self.output, "\nWhat would you like to delete?")?;
        writeln!(self.output, "1. Posts only")?;
        writeln!(self.output, "2. Comments only")?;
        writeln!(self.output, "3. Both posts and comments")?;
        let choice = match self.prompt("Enter your choice (1/2/3): ").await? {
            Some(choice) => choice,
            None => return self.finish_cancelled(&[], Vec::new()),
        };

        let scope = match DeletionScope::from_choice(&choice) {
            Some(scope) => scope,
            None => {
                writeln!(self.output, "Invalid choice. Exiting.")?;
                return Ok(RunOutcome::InvalidChoice);
            }
        };

        let question = format!(
            "\nThis will delete ALL {} for user {}. Are you sure? (yes/no): ",
            scope.description(),
            user.name
        );
        let answer = match self.prompt(&question).await? {
            Some(answer) => answer,
            None => return self.finish_cancelled(scope.kinds(), Vec::new()),
        };
        if !answer.eq_ignore_ascii_case("yes") {
            writeln!(self.output, "Deletion cancelled.")?;
            return Ok(RunOutcome::Declined);
        }

        let deleter = ContentDeleter::new(self.api, self.deleter_config.clone());
        let mut reports = Vec::new();
        for &kind in scope.kinds() {
            if self.cancel.is_cancelled() {
                break;
            }
            let report = deleter.run(kind, self.limit, &self.cancel).await;
            reports.push(report);
        }

        if self.cancel.is_cancelled() {
            return self.finish_cancelled(scope.kinds(), reports);
        }

        self.write_summary("Deletion Summary:", scope.kinds(), &reports)?;
        Ok(RunOutcome::Finished(reports))
    }

    /// Prints `text` and reads one trimmed line. `None` means the run was
    /// cancelled while waiting.
    async fn prompt(&mut self, text: &str) -> Result<Option<String>, CoreError> {
        write!(self.output, "{}", text)?;
        self.output.flush()?;

        let mut line = String::new();
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Ok(None),
            read = self.input.read_line(&mut line) => {
                read?;
                Ok(Some(line.trim().to_string()))
            }
        }
    }

    fn finish_cancelled(
        &mut self,
        kinds: &[ContentKind],
        reports: Vec<DeletionReport>,
    ) -> Result<RunOutcome, CoreError> {
        writeln!(self.output, "\nOperation cancelled by user.")?;
        self.write_summary("Partial Deletion Summary:", kinds, &reports)?;
        Ok(RunOutcome::Cancelled(reports))
    }

    fn write_summary(
        &mut self,
        title: &str,
        kinds: &[ContentKind],
        reports: &[DeletionReport],
    ) -> Result<(), CoreError> {
        writeln!(self.output, "\n{}", title)?;
        for kind in kinds {
            let deleted = reports
                .iter()
                .filter(|report| report.kind == *kind)
                .map(|report| report.deleted)
                .sum::<usize>();
            writeln!(self.output, "{} deleted: {}", kind.title_plural(), deleted)?;
        }
        self.output.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use eraser_core::{RedditApiError, StopReason};
    use reddit_client::{
        ContentItem, ContentPage, Deletable, RedditCommentData, RedditPostData, RedditUserData,
    };
    use std::sync::Mutex;
    use std::time::Duration;

    #[derive(Default)]
    struct FakeAccount {
        posts: Vec<ContentItem>,
        comments: Vec<ContentItem>,
        cancel_on_delete: Option<CancellationToken>,
        deleted: Mutex<Vec<String>>,
    }

    impl FakeAccount {
        fn with_history(posts: usize, comments: usize) -> Self {
            Self {
                posts: (0..posts).map(|i| post(&format!("p{}", i))).collect(),
                comments: (0..comments).map(|i| comment(&format!("c{}", i))).collect(),
                ..Default::default()
            }
        }

        fn deleted(&self) -> Vec<String> {
            self.deleted.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl UserContentApi for FakeAccount {
        async fn current_user(&self) -> Result<RedditUserData, CoreError> {
            Ok(RedditUserData {
                id: "u1".to_string(),
                name: "spez_fan".to_string(),
                created_utc: 0.0,
                link_karma: 0,
                comment_karma: 0,
            })
        }

        async fn list_user_content(
            &self,
            _username: &str,
            kind: ContentKind,
            _limit: u32,
            _after: Option<&str>,
        ) -> Result<ContentPage, CoreError> {
            // Deleted items vanish from the listing, as they do on Reddit.
            let deleted = self.deleted();
            let source = match kind {
                ContentKind::Post => &self.posts,
                ContentKind::Comment => &self.comments,
            };
            let items = source
                .iter()
                .filter(|item| !deleted.contains(&item.fullname()))
                .cloned()
                .collect();
            Ok(ContentPage { items, after: None })
        }

        async fn delete_item(&self, item: &ContentItem) -> Result<(), CoreError> {
            if item.fullname() == "t3_broken" {
                return Err(RedditApiError::Forbidden {
                    resource: item.fullname(),
                }
                .into());
            }
            self.deleted.lock().unwrap().push(item.fullname());
            if let Some(handle) = &self.cancel_on_delete {
                handle.cancel();
            }
            Ok(())
        }
    }

    fn post(id: &str) -> ContentItem {
        ContentItem::Post(RedditPostData {
            id: id.to_string(),
            name: format!("t3_{}", id),
            title: format!("Title {}", id),
            selftext: String::new(),
            subreddit: "test".to_string(),
            permalink: String::new(),
            created_utc: 1640995200.0,
            score: 1,
            num_comments: 0,
        })
    }

    fn comment(id: &str) -> ContentItem {
        ContentItem::Comment(RedditCommentData {
            id: id.to_string(),
            name: format!("t1_{}", id),
            body: format!("Body {}", id),
            subreddit: "test".to_string(),
            link_title: None,
            permalink: String::new(),
            created_utc: 1640995200.0,
            score: 1,
        })
    }

    async fn drive(
        account: &FakeAccount,
        input: &str,
        cancel: CancellationToken,
    ) -> (RunOutcome, String) {
        let mut output = Vec::new();
        let outcome = Driver::new(account, input.as_bytes(), &mut output, cancel)
            .with_deleter_config(DeleterConfig::default().with_delay(Duration::ZERO))
            .run()
            .await
            .unwrap();
        (outcome, String::from_utf8(output).unwrap())
    }

    #[test]
    fn test_scope_from_choice() {
        assert_eq!(DeletionScope::from_choice("1"), Some(DeletionScope::Posts));
        assert_eq!(DeletionScope::from_choice(" 2\n"), Some(DeletionScope::Comments));
        assert_eq!(DeletionScope::from_choice("3"), Some(DeletionScope::Both));
        assert_eq!(DeletionScope::from_choice("4"), None);
        assert_eq!(DeletionScope::from_choice(""), None);
        assert_eq!(
            DeletionScope::Both.kinds(),
            &[ContentKind::Post, ContentKind::Comment]
        );
    }

    #[tokio::test]
    async fn test_invalid_choice_deletes_nothing() {
        let account = FakeAccount::with_history(2, 2);
        let (outcome, output) = drive(&account, "7\n", CancellationToken::new()).await;

        assert_eq!(outcome, RunOutcome::InvalidChoice);
        assert!(output.contains("Invalid choice. Exiting."));
        assert!(account.deleted().is_empty());
    }

    #[tokio::test]
    async fn test_declined_confirmation_deletes_nothing() {
        for answer in ["no", "y", "yes please", ""] {
            let account = FakeAccount::with_history(2, 2);
            let input = format!("3\n{}\n", answer);
            let (outcome, output) = drive(&account, &input, CancellationToken::new()).await;

            assert_eq!(outcome, RunOutcome::Declined, "answer {:?}", answer);
            assert!(output.contains("Deletion cancelled."));
            assert!(account.deleted().is_empty());
        }
    }

    #[tokio::test]
    async fn test_confirmation_is_case_insensitive() {
        let account = FakeAccount::with_history(0, 2);
        let (outcome, output) = drive(&account, "2\n  YES \n", CancellationToken::new()).await;

        assert!(matches!(outcome, RunOutcome::Finished(_)));
        assert!(output.contains("This will delete ALL comments for user spez_fan."));
        assert!(output.contains("Comments deleted: 2"));
        assert!(!output.contains("Posts deleted"));
    }

    #[tokio::test]
    async fn test_both_deletes_posts_before_comments() {
        let account = FakeAccount::with_history(2, 3);
        let (outcome, output) = drive(&account, "3\nyes\n", CancellationToken::new()).await;

        assert_eq!(
            account.deleted(),
            vec!["t3_p0", "t3_p1", "t1_c0", "t1_c1", "t1_c2"]
        );
        match outcome {
            RunOutcome::Finished(reports) => {
                assert_eq!(reports.len(), 2);
                assert_eq!(reports[0].kind, ContentKind::Post);
                assert_eq!(reports[1].kind, ContentKind::Comment);
                assert!(reports.iter().all(|r| r.stop_reason == StopReason::Completed));
            }
            other => panic!("unexpected outcome {:?}", other),
        }

        let summary = output.split("Deletion Summary:").nth(1).unwrap();
        assert!(summary.contains("Posts deleted: 2\nComments deleted: 3"));
    }

    #[tokio::test]
    async fn test_failed_item_not_counted() {
        let mut account = FakeAccount::with_history(0, 0);
        account.posts = vec![post("a"), post("broken"), post("b")];
        let (_, output) = drive(&account, "1\nyes\n", CancellationToken::new()).await;

        assert_eq!(account.deleted(), vec!["t3_a", "t3_b"]);
        assert!(output.contains("Posts deleted: 2"));
    }

    #[tokio::test]
    async fn test_limit_applies_per_kind() {
        let account = FakeAccount::with_history(5, 5);
        let mut output = Vec::new();
        Driver::new(&account, "3\nyes\n".as_bytes(), &mut output, CancellationToken::new())
            .with_deleter_config(DeleterConfig::default().with_delay(Duration::ZERO))
            .with_limit(Some(1))
            .run()
            .await
            .unwrap();

        assert_eq!(account.deleted(), vec!["t3_p0", "t1_c0"]);
    }

    #[tokio::test]
    async fn test_cancel_during_posts_skips_comments() {
        let cancel = CancellationToken::new();
        let handle = cancel.clone();
        let mut account = FakeAccount::with_history(3, 3);
        account.cancel_on_delete = Some(handle);

        let (outcome, output) = drive(&account, "3\nyes\n", cancel).await;

        assert_eq!(account.deleted(), vec!["t3_p0"]);
        assert!(matches!(outcome, RunOutcome::Cancelled(_)));
        assert!(output.contains("Partial Deletion Summary:"));
        assert!(output.contains("Posts deleted: 1"));
        assert!(output.contains("Comments deleted: 0"));
    }

    #[tokio::test]
    async fn test_cancel_before_start() {
        let cancel = CancellationToken::new();
        let handle = cancel.clone();
        handle.cancel();
        let account = FakeAccount::with_history(1, 1);

        let (outcome, output) = drive(&account, "3\nyes\n", cancel).await;

        assert_eq!(outcome, RunOutcome::Cancelled(Vec::new()));
        assert!(output.contains("Partial Deletion Summary:"));
        assert!(!output.contains("What would you like to delete?"));
        assert!(account.deleted().is_empty());
    }

    #[tokio::test]
    async fn test_cancel_while_waiting_for_input() {
        let cancel = CancellationToken::new();
        let handle = cancel.clone();
        let account = FakeAccount::with_history(1, 1);

        // The writer half stays open so the read never completes on its own.
        let (_stdin_writer, stdin_reader) = tokio::io::duplex(64);
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            handle.cancel();
        });

        let mut output = Vec::new();
        let outcome = Driver::new(
            &account,
            tokio::io::BufReader::new(stdin_reader),
            &mut output,
            cancel,
        )
        .run()
        .await
        .unwrap();

        let output = String::from_utf8(output).unwrap();
        assert_eq!(outcome, RunOutcome::Cancelled(Vec::new()));
        assert!(output.contains("Enter your choice (1/2/3): "));
        assert!(output.contains("Operation cancelled by user."));
        assert!(account.deleted().is_empty());
    }
}
