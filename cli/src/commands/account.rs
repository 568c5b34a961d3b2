use anyhow::{Result, bail};
use chrono::{Local, NaiveDate};
use tabled::{
    Table, Tabled,
    settings::{Alignment, Modify, Style, object::Columns},
};

use pacer_core::Error;
use pacer_core::models::{AccountIdentity, CoinKind, TaskStatus};
use pacer_core::service::PacerService;

use super::helpers::{print_json, truncate};

fn require_login(svc: &PacerService) -> Result<()> {
    if !svc.store().is_logged_in() {
        bail!("Not logged in. Use `pacer account login <id>` first.");
    }
    Ok(())
}

/// Brings today's snapshot and step tasks up to date with the stored count.
async fn refresh(svc: &PacerService, today: NaiveDate) -> Result<()> {
    if let Some(push) = svc.refresh_today(today)? {
        push.await?;
    }
    Ok(())
}

pub(crate) async fn cmd_account_login(
    svc: &PacerService,
    union_id: &str,
    open_id: Option<String>,
    name: Option<String>,
    avatar: Option<String>,
    json: bool,
) -> Result<()> {
    if union_id.trim().is_empty() {
        bail!("Account id cannot be empty");
    }
    let today = Local::now().date_naive();
    let identity = AccountIdentity {
        union_id: union_id.trim().to_string(),
        open_id: open_id.unwrap_or_default(),
        display_name: name.unwrap_or_default(),
        avatar_uri: avatar.unwrap_or_default(),
    };
    svc.login(&identity, today).await?;
    refresh(svc, today).await?;

    let state = svc.store().state();
    if json {
        print_json(&state.user)?;
    } else if let Some(user) = &state.user {
        println!(
            "Logged in as {} ({}), balance {} coins, invite code {}",
            user.nickname, user.id, user.balance, user.invite_code
        );
    }
    Ok(())
}

pub(crate) async fn cmd_account_show(svc: &PacerService, json: bool) -> Result<()> {
    require_login(svc)?;
    refresh(svc, Local::now().date_naive()).await?;
    let state = svc.store().state();

    if json {
        print_json(&*state)?;
        return Ok(());
    }

    if let Some(user) = &state.user {
        println!("{} ({})", user.nickname, user.id);
        println!(
            "  Balance: {} coins (earned {} total)",
            user.balance, user.total_coins
        );
        println!("  Step target: {}", user.step_target);
        println!("  Sign-in streak: {} days", user.consecutive_sign_days);
        println!("  Invite code: {}", user.invite_code);
    }
    if let Some(today) = &state.today_snapshot {
        println!(
            "  Today ({}): {} steps, {:.2} km",
            today.date, today.steps, today.distance_km
        );
    }
    let week: Vec<String> = state
        .weekly_trend
        .iter()
        .map(|d| d.steps.to_string())
        .collect();
    println!("  Last 7 days: {}", week.join(" "));
    let signed: Vec<&str> = state
        .sign_records
        .iter()
        .map(|r| if r.completed { "x" } else { "." })
        .collect();
    println!("  Sign-ins: [{}]", signed.join(""));
    Ok(())
}

pub(crate) async fn cmd_account_sign_in(svc: &PacerService, reward: i64, json: bool) -> Result<()> {
    require_login(svc)?;
    if reward <= 0 {
        bail!("Reward must be greater than 0");
    }
    match svc.sign_in(Local::now().date_naive(), reward).await {
        Ok(()) => {}
        Err(Error::AlreadySignedToday { date }) => bail!("Already signed in for {date}"),
        Err(e) => return Err(e.into()),
    }

    let state = svc.store().state();
    if json {
        print_json(&state.user)?;
    } else if let Some(user) = &state.user {
        println!(
            "Signed in: +{reward} coins (balance {}, streak {} days)",
            user.balance, user.consecutive_sign_days
        );
    }
    Ok(())
}

pub(crate) async fn cmd_account_tasks(svc: &PacerService, json: bool) -> Result<()> {
    require_login(svc)?;
    refresh(svc, Local::now().date_naive()).await?;
    let state = svc.store().state();

    if json {
        print_json(&state.tasks)?;
        return Ok(());
    }

    #[derive(Tabled)]
    struct TaskRow {
        #[tabled(rename = "ID")]
        id: i64,
        #[tabled(rename = "Task")]
        title: String,
        #[tabled(rename = "Progress")]
        progress: String,
        #[tabled(rename = "Reward")]
        reward: i64,
        #[tabled(rename = "Status")]
        status: &'static str,
    }

    let rows: Vec<TaskRow> = state
        .tasks
        .iter()
        .map(|t| TaskRow {
            id: t.id,
            title: truncate(&t.title, 30),
            progress: format!("{}/{}", t.progress, t.target),
            reward: t.reward,
            status: t.status.as_str(),
        })
        .collect();
    let table = Table::new(&rows)
        .with(Style::rounded())
        .with(Modify::new(Columns::new(2..4)).with(Alignment::right()))
        .to_string();
    println!("{table}");

    let claimable = state
        .tasks
        .iter()
        .filter(|t| t.status == TaskStatus::Completed)
        .count();
    if claimable > 0 {
        eprintln!("{claimable} task(s) ready. Use `pacer account claim <id>` to collect.");
    }
    Ok(())
}

pub(crate) async fn cmd_account_claim(svc: &PacerService, task_id: i64, json: bool) -> Result<()> {
    require_login(svc)?;
    refresh(svc, Local::now().date_naive()).await?;
    let claimed = svc.claim_task(task_id).await?;

    if json {
        let state = svc.store().state();
        println!(
            "{}",
            serde_json::json!({
                "claimed": claimed,
                "task_id": task_id,
                "balance": state.user.as_ref().map(|u| u.balance),
            })
        );
    } else if claimed {
        let state = svc.store().state();
        let balance = state.user.as_ref().map_or(0, |u| u.balance);
        println!("Claimed task #{task_id} (balance {balance} coins)");
    } else {
        bail!("Task #{task_id} is not ready to claim");
    }
    Ok(())
}

pub(crate) fn cmd_account_coins(svc: &PacerService, json: bool) -> Result<()> {
    require_login(svc)?;
    let state = svc.store().state();

    if json {
        print_json(&state.coin_history)?;
    } else if state.coin_history.is_empty() {
        eprintln!("No coin history yet.");
    } else {
        #[derive(Tabled)]
        struct CoinRow {
            #[tabled(rename = "When")]
            when: String,
            #[tabled(rename = "What")]
            title: String,
            #[tabled(rename = "Coins")]
            amount: String,
        }

        let rows: Vec<CoinRow> = state
            .coin_history
            .iter()
            .map(|c| CoinRow {
                when: c.created_at.chars().take(16).collect::<String>().replace('T', " "),
                title: truncate(&c.title, 30),
                amount: match c.kind {
                    CoinKind::Income => format!("+{}", c.amount),
                    CoinKind::Expense => format!("-{}", c.amount),
                },
            })
            .collect();
        let table = Table::new(&rows)
            .with(Style::rounded())
            .with(Modify::new(Columns::single(2)).with(Alignment::right()))
            .to_string();
        println!("{table}");
    }
    Ok(())
}

pub(crate) async fn cmd_account_logout(svc: &PacerService, json: bool) -> Result<()> {
    let was_logged_in = svc.store().is_logged_in();
    svc.logout(Local::now().date_naive()).await?;

    if json {
        println!("{}", serde_json::json!({ "logged_out": was_logged_in }));
    } else if was_logged_in {
        println!("Logged out");
    } else {
        eprintln!("Not logged in");
    }
    Ok(())
}
