//! Command execution against a running [`ChatRuntime`].

use anyhow::{anyhow, bail, Context, Result};
use chrono::Utc;
use serde_json::{json, Value};
use threadchat_core::auth::{AuthAction, AuthForm};
use threadchat_core::store::{message_views, thread_summaries};
use threadchat_core::{Action, ChatRuntime, Lifecycle, Thread};
use tracing::info;

use super::command::CliCommand;
use super::format::{message_json, summaries_json};

/// Bootstrap the runtime, then run a one-shot command and return its JSON result
pub async fn execute(runtime: &mut ChatRuntime, command: CliCommand) -> Result<Value> {
    let lifecycle = runtime.bootstrap().await;
    if lifecycle == Lifecycle::Error && command.needs_remote_data() {
        bail!("Could not load threads and users from the document store");
    }

    match command {
        CliCommand::Threads => Ok(summaries_json(&thread_summaries(runtime.state()), Utc::now())),
        CliCommand::Show { thread_id } => show(runtime, &thread_id),
        CliCommand::NewThread { thread_id } => {
            let thread_id = thread_id.unwrap_or_else(Thread::generate_id);
            let created = runtime
                .dispatch(Action::CreateThread {
                    thread_id: thread_id.clone(),
                })
                .await;
            Ok(json!({ "id": thread_id, "created": created }))
        }
        CliCommand::Send { thread_id, text } => {
            require_thread(runtime, &thread_id)?;
            let sent = runtime
                .dispatch(Action::AppendMessage {
                    thread_id: thread_id.clone(),
                    text,
                })
                .await;
            Ok(json!({ "threadId": thread_id, "sent": sent }))
        }
        CliCommand::Title { thread_id, title } => {
            require_thread(runtime, &thread_id)?;
            let changed = runtime
                .dispatch(Action::SetTitle {
                    thread_id: thread_id.clone(),
                    title: title.clone(),
                })
                .await;
            Ok(json!({ "threadId": thread_id, "title": title, "changed": changed }))
        }
        CliCommand::LogIn { email, password } => {
            authenticate(runtime, AuthAction::LogIn, &email, &password, None).await
        }
        CliCommand::SignUp {
            email,
            password,
            display_name,
        } => authenticate(runtime, AuthAction::SignUp, &email, &password, Some(&display_name)).await,
        CliCommand::LogOut => {
            let logged_out = runtime.dispatch(Action::Logout).await;
            Ok(json!({ "loggedOut": logged_out }))
        }
        CliCommand::WhoAmI => Ok(json!({
            "user": runtime.state().active_user,
            "anonymousId": runtime.reconciler().session().anonymous_id(),
            "sender": runtime.reconciler().implicit_sender(),
        })),
        CliCommand::Watch => bail!("watch is not a one-shot command"),
    }
}

fn require_thread(runtime: &ChatRuntime, thread_id: &str) -> Result<()> {
    if runtime.state().thread(thread_id).is_none() {
        bail!("Thread not found: {}", thread_id);
    }
    Ok(())
}

fn show(runtime: &ChatRuntime, thread_id: &str) -> Result<Value> {
    let views = message_views(runtime.state(), thread_id)
        .ok_or_else(|| anyhow!("Thread not found: {}", thread_id))?;
    let title = thread_summaries(runtime.state())
        .into_iter()
        .find(|s| s.id == thread_id)
        .map(|s| s.title);

    Ok(json!({
        "id": thread_id,
        "title": title,
        "messages": views.iter().map(message_json).collect::<Vec<_>>(),
    }))
}

async fn authenticate(
    runtime: &mut ChatRuntime,
    action: AuthAction,
    email: &str,
    password: &str,
    display_name: Option<&str>,
) -> Result<Value> {
    if email.is_empty() || password.is_empty() {
        bail!("E-mail and password are required");
    }

    let mut form = AuthForm::new(action);
    if !runtime.submit_auth(&mut form, email, password, display_name).await {
        let message = form.error_message().unwrap_or("Authentication failed");
        bail!("{}", message);
    }

    let user = runtime
        .state()
        .active_user
        .clone()
        .context("Login did not set an active user")?;
    info!("{:?} succeeded for {}", form.action(), user.email);
    Ok(serde_json::to_value(user)?)
}

/// Follow both change feeds, calling `emit` with the thread list after every
/// applied change, until the feeds close or `stop` resolves.
pub async fn watch<F, S>(runtime: &mut ChatRuntime, mut emit: F, stop: S) -> Result<()>
where
    F: FnMut(&Value),
    S: std::future::Future<Output = ()>,
{
    let lifecycle = runtime.bootstrap().await;
    if lifecycle == Lifecycle::Error {
        bail!("Could not load threads and users from the document store");
    }
    runtime.start_watching().await?;
    emit(&summaries_json(&thread_summaries(runtime.state()), Utc::now()));

    tokio::pin!(stop);
    loop {
        let applied = tokio::select! {
            applied = runtime.next_replication() => applied,
            _ = &mut stop => break,
        };
        match applied {
            Some(true) => emit(&summaries_json(&thread_summaries(runtime.state()), Utc::now())),
            Some(false) => {}
            None => break,
        }
    }

    runtime.shutdown();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;
    use threadchat_core::auth::MemoryAuthProvider;
    use threadchat_core::remote::{Collection, MemoryDocumentStore};
    use threadchat_core::storage::{MemoryStorage, SessionStore};

    fn runtime() -> (ChatRuntime, Arc<MemoryDocumentStore>, Arc<MemoryAuthProvider>) {
        let store = Arc::new(MemoryDocumentStore::new());
        let auth = Arc::new(MemoryAuthProvider::new());
        let session = SessionStore::new(Arc::new(MemoryStorage::new()));
        (ChatRuntime::new(store.clone(), auth.clone(), session), store, auth)
    }

    #[tokio::test]
    async fn test_thread_commands() {
        let (mut runtime, store, _) = runtime();

        let created = execute(
            &mut runtime,
            CliCommand::NewThread {
                thread_id: Some("t1".into()),
            },
        )
        .await
        .unwrap();
        assert_eq!(created["created"], true);
        assert!(store.document(Collection::Threads, "t1").is_some());

        let sent = execute(
            &mut runtime,
            CliCommand::Send {
                thread_id: "t1".into(),
                text: "hello".into(),
            },
        )
        .await
        .unwrap();
        assert_eq!(sent["sent"], true);

        let threads = execute(&mut runtime, CliCommand::Threads).await.unwrap();
        assert_eq!(threads[0]["preview"], "Anonymous: hello");

        let shown = execute(&mut runtime, CliCommand::Show { thread_id: "t1".into() })
            .await
            .unwrap();
        assert_eq!(shown["title"], "Thread #1");
        assert_eq!(shown["messages"][0]["texts"][0], "hello");
    }

    #[tokio::test]
    async fn test_unknown_thread_is_an_error() {
        let (mut runtime, _, _) = runtime();
        let err = execute(
            &mut runtime,
            CliCommand::Send {
                thread_id: "nope".into(),
                text: "hi".into(),
            },
        )
        .await
        .unwrap_err();
        assert!(err.to_string().contains("Thread not found"));
    }

    #[tokio::test]
    async fn test_failed_login_reports_form_message() {
        let (mut runtime, _, _) = runtime();
        let err = execute(
            &mut runtime,
            CliCommand::LogIn {
                email: "who@example.com".into(),
                password: "pw".into(),
            },
        )
        .await
        .unwrap_err();
        assert_eq!(err.to_string(), "Invalid e-mail/password. User not found");
    }

    #[tokio::test]
    async fn test_sign_up_then_whoami() {
        let (mut runtime, _, _) = runtime();
        let user = execute(
            &mut runtime,
            CliCommand::SignUp {
                email: "grace@example.com".into(),
                password: "hopper".into(),
                display_name: "Grace Hopper".into(),
            },
        )
        .await
        .unwrap();
        assert_eq!(user["initials"], "G");

        let me = execute(&mut runtime, CliCommand::WhoAmI).await.unwrap();
        assert_eq!(me["user"]["email"], "grace@example.com");
        assert_eq!(me["sender"], user["userId"]);
    }

    #[tokio::test]
    async fn test_bootstrap_failure_blocks_data_commands() {
        let (mut runtime, store, _) = runtime();
        store.set_fail_fetches(true);

        assert!(execute(&mut runtime, CliCommand::Threads).await.is_err());
        let me = execute(&mut runtime, CliCommand::WhoAmI).await.unwrap();
        assert!(me["user"].is_null());
    }

    #[tokio::test]
    async fn test_watch_emits_on_remote_change() {
        let (mut runtime, store, _) = runtime();
        let mut emitted = Vec::new();

        let remote = store.clone();
        let stop = async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            remote.external_put(
                Collection::Threads,
                "remote",
                serde_json::json!({"id": "remote", "messages": [], "createdAt": 1}),
            );
            tokio::time::sleep(Duration::from_millis(50)).await;
        };

        watch(&mut runtime, |value| emitted.push(value.clone()), stop)
            .await
            .unwrap();

        let last = emitted.last().unwrap();
        assert_eq!(last[0]["id"], "remote");
        assert!(!runtime.is_watching());
    }
}
