//! Event loop and command executor.
//!
//! Architecture: a single thread owns the model and runs the loop — read one
//! message, apply the pure update, execute the returned commands, redraw.
//! Commands run on short-lived worker threads over a crossbeam channel; each
//! delivers exactly one message back. An input thread translates terminal
//! events into messages. Timers are worker threads that sleep once and send
//! one message; no callback ever touches the model directly.

#![allow(missing_docs)]

use std::io::{self, Write};
use std::sync::Arc;
use std::thread;

use crossbeam_channel::{Sender, unbounded};
use crossterm::cursor::MoveTo;
use crossterm::event::{self, Event, KeyEventKind};
use crossterm::queue;
use crossterm::terminal::{Clear, ClearType};

use crate::core::errors::{GlsError, Result};
use crate::logger::{ActivityKind, ActivityLog};
use crate::models::{PipelineWithStages, ScheduleChanges, Variable, aggregate_stages};
use crate::services::gitlab::ScheduleApi;
use crate::services::profiles::ProfileStore;

use super::model::{AppModel, Cmd, Msg, QUICK_RUN_LIST_LIMIT};
use super::render::render;
use super::terminal_guard::TerminalGuard;
use super::theme::Theme;
use super::update::update;

/// Collaborators handed to command bodies. Cheap to clone; every worker
/// thread gets its own handle.
#[derive(Clone)]
pub struct Services {
    pub api: Arc<dyn ScheduleApi>,
    pub store: Arc<dyn ProfileStore>,
    pub log: ActivityLog,
}

/// Run the dashboard until the user quits.
///
/// # Errors
/// Returns terminal setup failures and loop channel breakage; remote-call
/// failures stay inside the loop as error banners.
pub fn run(services: &Services, theme: &Theme) -> Result<()> {
    let _guard = TerminalGuard::new().map_err(|err| GlsError::io("terminal", err))?;
    let (tx, rx) = unbounded::<Msg>();

    spawn_input_thread(&tx);

    let mut model = AppModel::new(TerminalGuard::terminal_size());
    execute(Cmd::LoadProfiles, &tx, services);

    let mut stdout = io::stdout();
    loop {
        draw(&mut stdout, &render(&model, theme))
            .map_err(|err| GlsError::io("stdout", err))?;

        let msg = rx.recv().map_err(|_| GlsError::ChannelClosed {
            component: "event loop",
        })?;

        let mut quit = false;
        for cmd in update(&mut model, msg) {
            if cmd == Cmd::Quit {
                quit = true;
            } else {
                execute(cmd, &tx, services);
            }
        }
        if quit {
            return Ok(());
        }
    }
}

/// Translate terminal events into messages until the channel closes.
fn spawn_input_thread(tx: &Sender<Msg>) {
    let tx = tx.clone();
    thread::spawn(move || {
        loop {
            let message = match event::read() {
                Ok(Event::Key(key)) if key.kind == KeyEventKind::Press => Msg::Key(key),
                Ok(Event::Resize(cols, rows)) => Msg::Resize(cols, rows),
                Ok(_) => continue,
                Err(_) => break,
            };
            if tx.send(message).is_err() {
                break;
            }
        }
    });
}

fn draw(stdout: &mut io::Stdout, frame: &str) -> io::Result<()> {
    queue!(stdout, MoveTo(0, 0), Clear(ClearType::All))?;
    stdout.write_all(frame.as_bytes())?;
    stdout.flush()
}

/// Execute one command. Timers and remote work go to worker threads; the
/// loop thread never blocks here.
pub fn execute(cmd: Cmd, tx: &Sender<Msg>, services: &Services) {
    match cmd {
        Cmd::Emit(msg) => {
            let _ = tx.send(msg);
        }
        Cmd::Quit => {}
        Cmd::ClearStatusAfter { generation, delay } => {
            let tx = tx.clone();
            thread::spawn(move || {
                thread::sleep(delay);
                let _ = tx.send(Msg::ClearStatus { generation });
            });
        }
        Cmd::PollPipelinesAfter { delay } => {
            let tx = tx.clone();
            thread::spawn(move || {
                thread::sleep(delay);
                let _ = tx.send(Msg::PollPipelines);
            });
        }
        other => {
            let tx = tx.clone();
            let services = services.clone();
            thread::spawn(move || {
                let _ = tx.send(run_command(other, &services));
            });
        }
    }
}

/// Synchronous body of a data command: exactly one message out, every
/// failure folded into [`Msg::Error`]. Timer delays are handled by
/// [`execute`]; this function never sleeps.
pub fn run_command(cmd: Cmd, services: &Services) -> Msg {
    let api = &services.api;
    let store = &services.store;
    let log = &services.log;

    match cmd {
        Cmd::Emit(msg) => msg,
        Cmd::Quit => Msg::ClearStatus { generation: 0 },
        Cmd::ClearStatusAfter { generation, .. } => Msg::ClearStatus { generation },
        Cmd::PollPipelinesAfter { .. } => Msg::PollPipelines,

        Cmd::LoadProfiles => match store.load() {
            Ok(profiles) => Msg::ProfilesLoaded(profiles),
            Err(err) => failure(log, ActivityKind::CommandError, "load profiles", &err),
        },

        Cmd::ConnectProfile { index, profile } => match api.connect(&profile) {
            Err(err) => failure(log, ActivityKind::Connect, &profile.name, &err),
            Ok(resolved) => match api.list_schedules() {
                Err(err) => failure(log, ActivityKind::Connect, &profile.name, &err),
                Ok(schedules) => {
                    // Branches and user identity are best-effort; the list
                    // screen works without them.
                    let branches = api.list_branches().unwrap_or_default();
                    let user = api.current_user().ok();
                    log.success(ActivityKind::Connect, &resolved.name);
                    Msg::ProfileConnected {
                        index,
                        profile: resolved,
                        schedules,
                        branches,
                        user,
                    }
                }
            },
        },

        Cmd::SaveProfile {
            index,
            draft,
            mut profiles,
        } => match api.validate_profile(&draft) {
            Err(err) => failure(log, ActivityKind::ProfileSave, &draft.name, &err),
            Ok(resolved) => {
                match index {
                    None => profiles.push(resolved),
                    Some(i) if i < profiles.len() => profiles[i] = resolved,
                    Some(i) => {
                        let err = GlsError::ProfileIndex {
                            index: i,
                            len: profiles.len(),
                        };
                        return failure(log, ActivityKind::ProfileSave, &draft.name, &err);
                    }
                }
                match store.save(&profiles) {
                    Err(err) => failure(log, ActivityKind::ProfileSave, &draft.name, &err),
                    Ok(()) => {
                        log.success(ActivityKind::ProfileSave, &draft.name);
                        Msg::ProfilesSaved {
                            profiles,
                            message: "Profile saved!".to_string(),
                        }
                    }
                }
            }
        },

        Cmd::DeleteProfile {
            index,
            mut profiles,
        } => {
            if index >= profiles.len() {
                let err = GlsError::ProfileIndex {
                    index,
                    len: profiles.len(),
                };
                return failure(log, ActivityKind::ProfileDelete, "profile", &err);
            }
            let removed = profiles.remove(index);
            match store.save(&profiles) {
                Err(err) => failure(log, ActivityKind::ProfileDelete, &removed.name, &err),
                Ok(()) => {
                    log.success(ActivityKind::ProfileDelete, &removed.name);
                    Msg::ProfilesSaved {
                        profiles,
                        message: "Profile deleted!".to_string(),
                    }
                }
            }
        }

        Cmd::PersistProfiles { profiles } => match store.save(&profiles) {
            Err(err) => failure(log, ActivityKind::ProfileSave, "store", &err),
            Ok(()) => Msg::ProfilesPersisted(profiles),
        },

        Cmd::CreateSchedule { draft } => match api.create_schedule(&draft) {
            Err(err) => failure(log, ActivityKind::ScheduleCreate, &draft.description, &err),
            Ok(created) => {
                log.success(ActivityKind::ScheduleCreate, &created.description);
                Msg::SchedulesSaved {
                    schedules: api.list_schedules().unwrap_or_default(),
                    message: "Schedule created!".to_string(),
                }
            }
        },

        Cmd::UpdateSchedule {
            id,
            draft,
            take_ownership,
        } => {
            if take_ownership {
                if let Err(err) = api.take_ownership(id) {
                    return failure(log, ActivityKind::OwnershipTaken, &draft.description, &err);
                }
            }
            let changes = ScheduleChanges::from_draft(&draft);
            if let Err(err) = api.update_schedule(id, &changes) {
                return failure(log, ActivityKind::ScheduleUpdate, &draft.description, &err);
            }
            if let Err(err) = sync_variables(api.as_ref(), id, &draft.variables) {
                return failure(log, ActivityKind::ScheduleUpdate, &draft.description, &err);
            }
            log.success(ActivityKind::ScheduleUpdate, &draft.description);
            let message = if take_ownership {
                "Ownership taken and schedule saved!"
            } else {
                "Schedule saved!"
            };
            Msg::SchedulesSaved {
                schedules: api.list_schedules().unwrap_or_default(),
                message: message.to_string(),
            }
        }

        Cmd::DeleteSchedule { id } => match api.delete_schedule(id) {
            Err(err) => failure(log, ActivityKind::ScheduleDelete, &id.to_string(), &err),
            Ok(()) => {
                log.success(ActivityKind::ScheduleDelete, &id.to_string());
                Msg::SchedulesSaved {
                    schedules: api.list_schedules().unwrap_or_default(),
                    message: "Schedule deleted!".to_string(),
                }
            }
        },

        Cmd::SetScheduleActive { id, active } => {
            let changes = ScheduleChanges {
                active: Some(active),
                ..ScheduleChanges::default()
            };
            match api.update_schedule(id, &changes) {
                Err(err) => failure(log, ActivityKind::ScheduleToggle, &id.to_string(), &err),
                Ok(_) => {
                    log.success(ActivityKind::ScheduleToggle, &id.to_string());
                    Msg::SchedulesLoaded(api.list_schedules().unwrap_or_default())
                }
            }
        }

        Cmd::RunSchedule { id } => match api.run_schedule(id) {
            Err(err) => failure(log, ActivityKind::ScheduleRun, &id.to_string(), &err),
            Ok(()) => {
                log.success(ActivityKind::ScheduleRun, &id.to_string());
                Msg::SchedulesSaved {
                    schedules: api.list_schedules().unwrap_or_default(),
                    message: "Pipeline started!".to_string(),
                }
            }
        },

        Cmd::TakeOwnership { id } => match api.take_ownership(id) {
            Err(err) => failure(log, ActivityKind::OwnershipTaken, &id.to_string(), &err),
            Ok(_) => {
                log.success(ActivityKind::OwnershipTaken, &id.to_string());
                Msg::OwnershipTaken {
                    schedules: api.list_schedules().unwrap_or_default(),
                }
            }
        },

        Cmd::RefreshSchedules => match api.list_schedules() {
            Err(err) => failure(log, ActivityKind::CommandError, "refresh schedules", &err),
            Ok(schedules) => Msg::SchedulesSaved {
                schedules,
                message: "Schedules refreshed!".to_string(),
            },
        },

        Cmd::StartPipeline { request } => match api.create_pipeline(&request) {
            Err(err) => failure(log, ActivityKind::PipelineStart, &request.ref_name, &err),
            Ok(_) => {
                log.success(ActivityKind::PipelineStart, &request.ref_name);
                Msg::PipelineStarted
            }
        },

        Cmd::LoadPipelines => match api.list_pipelines(QUICK_RUN_LIST_LIMIT) {
            Err(err) => failure(log, ActivityKind::CommandError, "load pipelines", &err),
            Ok(pipelines) => {
                let with_stages: Vec<PipelineWithStages> = pipelines
                    .into_iter()
                    .map(|pipeline| {
                        let jobs = api.list_pipeline_jobs(pipeline.id).unwrap_or_default();
                        PipelineWithStages {
                            stages: aggregate_stages(&jobs),
                            pipeline,
                        }
                    })
                    .collect();
                Msg::PipelinesLoaded(with_stages)
            }
        },
    }
}

/// Bring a schedule's remote variables in line with the form's rows:
/// create missing keys, update changed values, delete removed keys.
fn sync_variables(api: &dyn ScheduleApi, id: u64, desired: &[Variable]) -> Result<()> {
    let current = api.get_schedule(id)?.variables;

    for variable in desired {
        match current.iter().find(|c| c.key == variable.key) {
            None => api.create_variable(id, variable)?,
            Some(existing)
                if existing.value != variable.value
                    || existing.variable_type != variable.variable_type =>
            {
                api.update_variable(id, variable)?;
            }
            Some(_) => {}
        }
    }
    for existing in &current {
        if !desired.iter().any(|v| v.key == existing.key) {
            api.delete_variable(id, &existing.key)?;
        }
    }
    Ok(())
}

fn failure(log: &ActivityLog, kind: ActivityKind, detail: &str, err: &GlsError) -> Msg {
    log.failure(kind, detail, err.code());
    Msg::Error(err.to_string())
}
