use std::sync::Arc;
use std::time::Duration;

use spdm_core::ErrorKind;
use spdm_types::formatting::format_coins;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval};

use crate::app_state::{AppState, now};
use crate::commands::print_error;

/// Drive the AFK farm once per second until it stops.
///
/// The handle is kept in [`AppState::afk_task`]; aborting it is how the shell
/// stops the timer.
pub fn spawn_afk_ticker(state: Arc<RwLock<AppState>>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = interval(Duration::from_secs(1));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // First tick completes immediately
        ticker.tick().await;

        loop {
            ticker.tick().await;
            let mut guard = state.write().await;
            let s = &mut *guard;

            match s.afk.tick(&mut s.session, now()).await {
                Ok(tick) => {
                    if let Some(balance) = tick.balance {
                        println!(
                            "\n+{} coin(s) from AFK Farm (balance {})",
                            tick.granted,
                            format_coins(balance)
                        );
                    }
                    if tick.music_prompt {
                        println!("\nStill there? Keep the music playing to continue farming.");
                    }
                    if tick.limit_reached {
                        println!("\nDaily AFK limit reached. Come back tomorrow!");
                    }
                }
                Err(e) => {
                    print_error(&e);
                    if e.kind() == ErrorKind::Auth {
                        s.afk.stop();
                    }
                }
            }

            if !s.afk.is_active() {
                // Dropping our own handle just detaches the task
                s.afk_task = None;
                tracing::debug!("AFK ticker finished");
                break;
            }
        }
    })
}
