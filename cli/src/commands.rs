use std::sync::Arc;

use chrono::TimeDelta;
use spdm_core::admin::{adjust_balance, ban_user, set_admin, unban_user};
use spdm_core::config::{self, APP_NAME};
use spdm_core::promo::{NewPromo, generate_code};
use spdm_core::{AuthUser, CoinEvent, EconomyError, Notice, Role, Severity};
use spdm_types::formatting::{format_coins, format_progress, format_timer, format_wait};
use tokio::sync::RwLock;

use crate::app_state::{AppState, now};
use crate::ticker::spawn_afk_ticker;

pub fn print_notice(notice: &Notice) {
    let marker = match notice.severity {
        Severity::Success => "+",
        Severity::Info => "i",
        Severity::Error => "!",
    };
    println!("[{marker}] {notice}");
}

pub fn print_error(err: &EconomyError) {
    tracing::debug!(error = %err, kind = ?err.kind(), "command failed");
    print_notice(&err.notice());
}

fn print_event(event: &CoinEvent) {
    if let Some(notice) = event.notice() {
        print_notice(&notice);
    }
}

// --- Session ---

pub async fn login(state: Arc<RwLock<AppState>>, id: &str, username: Option<&str>, role: Role) {
    let mut s = state.write().await;
    let user = AuthUser::new(id, username.unwrap_or(id)).with_role(role);
    s.store.register_user(&user.id, &user.username).await;

    let user = match s.login(user, now()).await {
        Ok(user) => user,
        Err(e) => {
            print_error(&e);
            return;
        }
    };
    let balance = s.session.cached_wallet().map(|w| w.balance).unwrap_or_default();
    println!(
        "Logged in as {} ({:?}), balance {} coins",
        user.id,
        user.role,
        format_coins(balance)
    );
}

pub async fn logout(state: Arc<RwLock<AppState>>) {
    match state.write().await.logout() {
        Some(user) => print_notice(&Notice::info("Logged out", user.username)),
        None => println!("Not logged in"),
    }
}

pub async fn balance(state: Arc<RwLock<AppState>>) {
    let mut s = state.write().await;
    match s.session.refresh(now()).await {
        Ok(event) => println!("Balance: {} coins", format_coins(event.balance())),
        Err(e) => print_error(&e),
    }
}

// --- AFK farm ---

pub async fn afk_start(state: Arc<RwLock<AppState>>) {
    let mut s = state.write().await;
    let s_ref = &mut *s;
    if let Err(e) = s_ref.afk.start(&s_ref.session, now()) {
        print_error(&e);
        return;
    }
    if s_ref.afk_task.is_none() {
        s_ref.afk_task = Some(spawn_afk_ticker(Arc::clone(&state)));
    }
    println!("AFK farm started");
}

pub async fn afk_stop(state: Arc<RwLock<AppState>>) {
    let mut s = state.write().await;
    s.stop_afk_task();
    if s.afk.stop() {
        println!("AFK farm stopped, {} coins earned today", s.afk.earned());
    } else {
        println!("AFK farm is not running");
    }
}

pub async fn afk_status(state: Arc<RwLock<AppState>>) {
    let mut s = state.write().await;
    let status = s.afk.status(now());
    println!(
        "AFK farm {} | running {} | {}",
        if status.active { "active" } else { "stopped" },
        format_timer(status.elapsed_secs),
        format_progress(status.earned, status.cap)
    );
    match status.minutes_to_limit {
        Some(mins) => println!("{mins} minute(s) of farming left today"),
        None => println!("Daily limit reached"),
    }
}

/// Run `secs` ticks back to back instead of waiting in real time
pub async fn afk_fast_forward(state: Arc<RwLock<AppState>>, secs: u64) {
    let mut guard = state.write().await;
    let s = &mut *guard;
    let start = now();
    let mut granted = 0;

    for i in 1..=secs.min(86_400) {
        if !s.afk.is_active() {
            break;
        }
        let at = start + TimeDelta::seconds(i64::try_from(i).unwrap_or_default());
        match s.afk.tick(&mut s.session, at).await {
            Ok(tick) => {
                granted += tick.granted;
                if tick.limit_reached {
                    println!("Daily AFK limit reached");
                }
            }
            Err(e) => {
                print_error(&e);
                break;
            }
        }
    }
    println!("Fast-forwarded, {granted} coin(s) earned");
}

// --- Reward links ---

pub async fn list_links(state: Arc<RwLock<AppState>>) {
    let mut s = state.write().await;
    s.links.roll_window(now());
    println!("Reward links: {}", format_progress(s.links.earned(), s.links.cap()));
    for link in s.links.links() {
        let status = if s.links.is_claimed(link.id) { "claimed" } else { "available" };
        println!("  [{}] {} +{} coins ({status}) {}", link.id, link.name, link.coins, link.url);
    }
}

pub async fn open_link(state: Arc<RwLock<AppState>>, id: u32) {
    let mut guard = state.write().await;
    let s = &mut *guard;
    match s.links.open(&s.session, id, now()) {
        Ok(link) => {
            println!(
                "Open {} and stay at least {} seconds:",
                link.name, s.config.reward_links.min_away_secs
            );
            println!("  {}", link.url);
            println!("Run `return-link` when you are back.");
        }
        Err(e) => print_error(&e),
    }
}

pub async fn return_link(state: Arc<RwLock<AppState>>) {
    let mut guard = state.write().await;
    let s = &mut *guard;
    match s.links.complete_visit(&mut s.session, now()).await {
        Ok(claim) => println!(
            "+{} coins (balance {}), {}",
            claim.coins,
            format_coins(claim.balance),
            format_progress(claim.earned_in_window, s.links.cap())
        ),
        Err(e) => print_error(&e),
    }
}

// --- Spin wheel ---

pub async fn spin(state: Arc<RwLock<AppState>>) {
    let mut guard = state.write().await;
    let s = &mut *guard;
    match s.wheel.spin(&mut s.session, &mut s.rng, now()).await {
        Ok(outcome) => match outcome.balance {
            Some(balance) => println!(
                "The wheel landed on {}! +{} coins (balance {})",
                outcome.label,
                outcome.coins,
                format_coins(balance)
            ),
            None => println!("The wheel landed on {}. Better luck tomorrow!", outcome.label),
        },
        Err(e) => print_error(&e),
    }
}

// --- Leaderboard & daily reward ---

pub async fn leaderboard(state: Arc<RwLock<AppState>>) {
    let mut guard = state.write().await;
    let s = &mut *guard;
    let now = now();
    if s.leaderboard.needs_refresh(now) {
        if let Err(e) = s.leaderboard.refresh(&s.session, now).await {
            print_error(&e);
            return;
        }
    }

    let me = s.session.user().map(|u| u.id.as_str());
    for entry in s.leaderboard.entries() {
        let marker = if Some(entry.user_id.as_str()) == me { " <- you" } else { "" };
        let reward = s
            .leaderboard
            .reward_for(entry.position)
            .map(|c| format!(" (+{c} weekly)"))
            .unwrap_or_default();
        println!(
            "{:>3}. {:<20} {:>10}{reward}{marker}",
            entry.position,
            entry.username,
            format_coins(entry.balance)
        );
    }
}

pub async fn claim_leaderboard(state: Arc<RwLock<AppState>>) {
    let mut guard = state.write().await;
    let s = &mut *guard;
    match s.leaderboard.claim_reward(&mut s.session, now()).await {
        Ok(claim) => println!(
            "Top {} reward: +{} coins (balance {}). Next claim on {}",
            claim.position,
            claim.coins,
            format_coins(claim.balance),
            claim.next_eligible.format(spdm_core::error::DATE_FORMAT)
        ),
        Err(e) => print_error(&e),
    }
}

pub async fn daily(state: Arc<RwLock<AppState>>) {
    let mut guard = state.write().await;
    let s = &mut *guard;
    let now = now();
    match s.daily.claim(&mut s.session, now).await {
        Ok(claim) => println!(
            "+{} coins (balance {}). Come back in {}",
            claim.coins,
            format_coins(claim.balance),
            format_wait(u64::try_from((claim.next_eligible - now).num_seconds()).unwrap_or(0))
        ),
        Err(e) => print_error(&e),
    }
}

// --- Shop & promo codes ---

pub async fn shop(state: Arc<RwLock<AppState>>) {
    let s = state.read().await;
    for item in s.shop.items() {
        println!(
            "  {:<12} {:<12} {:>6} coins  [{} in stock]  {}",
            item.id,
            item.name,
            format_coins(i64::from(item.price)),
            s.shop.keys_available(&item.id),
            item.description
        );
    }
}

pub async fn buy(state: Arc<RwLock<AppState>>, item_id: &str) {
    let mut guard = state.write().await;
    let s = &mut *guard;
    match s.shop.purchase(&mut s.session, item_id, &mut s.rng, now()).await {
        Ok(purchase) => {
            print_notice(&Notice::success(
                "Purchase successful!",
                format!("You bought {} for {} coins", purchase.item_name, purchase.price),
            ));
            println!("Your key: {}", purchase.key);
            println!("Balance: {} coins", format_coins(purchase.balance));
        }
        Err(e) => print_error(&e),
    }
}

pub async fn redeem(state: Arc<RwLock<AppState>>, code: &str) {
    let mut guard = state.write().await;
    let s = &mut *guard;
    match s.promos.redeem(&mut s.session, code, now()).await {
        Ok(redemption) => print_event(&CoinEvent::Earned {
            amount: i64::from(redemption.amount),
            source: format!("promo code {}", redemption.code),
            balance: redemption.balance,
        }),
        Err(e) => print_error(&e),
    }
}

pub async fn promo_create(
    state: Arc<RwLock<AppState>>,
    code: Option<String>,
    amount: i64,
    max_uses: Option<u32>,
    expires_days: Option<u32>,
) {
    let mut guard = state.write().await;
    let s = &mut *guard;
    let now = now();
    let code = code.unwrap_or_else(|| generate_code(&mut s.rng));
    let new = NewPromo {
        code,
        amount,
        max_uses,
        expires_at: expires_days.map(|d| now + TimeDelta::days(i64::from(d))),
    };
    match s.promos.create(&s.session, new, now) {
        Ok(promo) => println!("Created promo code {} (#{}) worth {} coins", promo.code, promo.id, promo.amount),
        Err(e) => print_error(&e),
    }
}

pub async fn promo_toggle(state: Arc<RwLock<AppState>>, id: u64) {
    let mut guard = state.write().await;
    let s = &mut *guard;
    match s.promos.toggle(&s.session, id) {
        Ok(active) => println!(
            "Promo code {}",
            if active { "activated" } else { "deactivated" }
        ),
        Err(e) => print_error(&e),
    }
}

pub async fn promo_delete(state: Arc<RwLock<AppState>>, id: u64) {
    let mut guard = state.write().await;
    let s = &mut *guard;
    match s.promos.delete(&s.session, id) {
        Ok(promo) => println!("Deleted promo code {}", promo.code),
        Err(e) => print_error(&e),
    }
}

pub async fn promo_list(state: Arc<RwLock<AppState>>) {
    let s = state.read().await;
    let now = now();
    match s.promos.list(&s.session) {
        Ok(codes) if codes.is_empty() => println!("No promo codes found"),
        Ok(codes) => {
            for p in codes {
                let uses = match p.max_uses {
                    Some(max) => format!("{}/{max}", p.current_uses),
                    None => p.current_uses.to_string(),
                };
                let status = if !p.is_active {
                    "inactive"
                } else if p.is_expired(now) {
                    "expired"
                } else {
                    "active"
                };
                println!(
                    "  #{:<3} {:<12} {:>6} coins  uses {uses:<7} {status}",
                    p.id, p.code, p.amount
                );
            }
        }
        Err(e) => print_error(&e),
    }
}

// --- Admin ---

pub async fn grant(state: Arc<RwLock<AppState>>, target: &str, change: i64) {
    let mut guard = state.write().await;
    let s = &mut *guard;
    let limit = s.config.admin.adjust_limit;
    match adjust_balance(&mut s.session, target, change, limit).await {
        Ok(adj) => println!(
            "Balance of {} {} by {} coins (now {})",
            adj.target,
            if adj.change > 0 { "increased" } else { "decreased" },
            adj.change.unsigned_abs(),
            format_coins(adj.balance)
        ),
        Err(e) => print_error(&e),
    }
}

pub async fn ban(state: Arc<RwLock<AppState>>, target: &str, reason: &str) {
    let mut s = state.write().await;
    match ban_user(&mut s.session, target, reason, now()).await {
        Ok(ban) => print_notice(&Notice::success(
            "User banned",
            format!("{target} was banned: {}", ban.reason),
        )),
        Err(e) => print_error(&e),
    }
}

pub async fn unban(state: Arc<RwLock<AppState>>, target: &str) {
    let mut s = state.write().await;
    match unban_user(&mut s.session, target).await {
        Ok(_) => print_notice(&Notice::success("User unbanned", format!("{target} can log in again"))),
        Err(e) => print_error(&e),
    }
}

pub async fn grant_admin(state: Arc<RwLock<AppState>>, target: &str, is_admin: bool) {
    let mut s = state.write().await;
    match set_admin(&mut s.session, target, is_admin).await {
        Ok(()) => print_notice(&Notice::success(
            "Admin status updated",
            format!(
                "{target} {} admin role",
                if is_admin { "added to" } else { "removed from" }
            ),
        )),
        Err(e) => print_error(&e),
    }
}

// --- Misc ---

pub async fn show_settings(state: Arc<RwLock<AppState>>) {
    let s = state.read().await;
    match config::config_path() {
        Ok(path) => println!("Config file: {}", path.display()),
        Err(e) => println!("Config file: unavailable ({e})"),
    }
    if let Some(path) = &s.store_path {
        println!("Wallet file: {}", path.display());
    }
    let c = &s.config;
    println!("AFK farm:     {} coins/day, 1 per {}s", c.afk.limit.cap, c.afk.coin_interval_secs);
    println!(
        "Reward links: {} coins/day, {} links, {}s minimum visit",
        c.reward_links.limit.cap,
        c.reward_links.links.len(),
        c.reward_links.min_away_secs
    );
    println!("Spin wheel:   {} spin(s)/day", c.spin_wheel.limit.cap);
    println!(
        "Daily reward: {} coins every {}h",
        c.daily_reward.coins, c.daily_reward.cooldown_hours
    );
    println!(
        "Leaderboard:  top {} rewards {:?} every {} days",
        c.leaderboard.position_rewards.len(),
        c.leaderboard.position_rewards,
        c.leaderboard.cooldown_days
    );
}

/// Persist wallets if a store file is configured
pub async fn save_store(state: &Arc<RwLock<AppState>>) {
    let s = state.read().await;
    if let Some(path) = &s.store_path {
        if let Err(e) = s.store.save_json(path).await {
            tracing::error!(path = %path.display(), error = %e, "failed to save wallets");
        }
    }
}

pub fn exit() {
    println!("Thanks for using {APP_NAME}!");
}
