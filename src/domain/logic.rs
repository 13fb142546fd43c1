//! Server-authoritative weapon and damage rules.
//!
//! Every client input is replayed against the server's copy of the player's
//! weapons. Damage requests are only honoured for shots the server saw fired.

use glam::Vec3;
use crate::domain::inventory::{InventoryEvent, PullOutToken, SwitchRejected, SwitchResult};
use crate::domain::relay::{damage_allowed, DamageRequest, FireAction, ShotFx, SoundKey};
use crate::domain::simulator::EYE_HEIGHT;
use crate::domain::weapon::{FireOutcome, FireResult, ReloadMode, ReloadRejected, WeaponEvent};
use crate::domain::PlayerId;
use crate::state::lobby::Lobby;
use crate::utils::buffers::SyncEvent;
use crate::utils::config::Config;

/// Where players come back after dying
pub const SPAWN_POINT: Vec3 = Vec3::ZERO;

/// Applied damage for one accepted request
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HitOutcome {
    pub damage: f32,
    pub was_kill: bool,
}

/// Replay a client's trigger pull. The weapon's fire rate is checked on the
/// shooter's own timeline, and the fire budget bounds that timeline against
/// server time. A rejected pull resyncs the owner's ammo.
pub fn handle_fire(
    lobby: &mut Lobby,
    player_id: PlayerId,
    action: &FireAction,
) -> Result<FireOutcome, &'static str> {
    let now = lobby.clock;
    let player = lobby.players.get_mut(&player_id)
        .ok_or("Player not found")?;

    if player.is_dead {
        return Err("Player is dead");
    }
    if !action.fired_at.is_finite() {
        return Err("Invalid fire time");
    }
    if action.weapon_index != player.inventory.current_index() {
        return Err("Fire from inactive weapon slot");
    }
    if action.pellet_count != player.inventory.current().definition().pellet_count() {
        return Err("Pellet count mismatch");
    }
    if action.first_shot_seq < player.fired_seq_limit {
        return Err("Stale shot sequence");
    }

    let interval = player.inventory.current().definition().fire_interval();
    let result = if player.fire_budget.has_shot(now, interval) {
        player.inventory.try_fire(action.fired_at)
    } else {
        FireResult { outcome: FireOutcome::RateLimited, reload_cancelled: false }
    };
    let weapon_index = player.inventory.current_index();
    let ammo = player.inventory.current().ammo();

    if result.fired() {
        player.fire_budget.spend();
        player.fired_seq_limit = action.first_shot_seq + u64::from(action.pellet_count);
        lobby.mark_dirty(player_id);
    } else {
        log::debug!("Player {} fire rejected: {:?}", player_id, result.outcome);
        if result.reload_cancelled {
            lobby.mark_dirty(player_id);
        }
        lobby.emit(SyncEvent::AmmoSync { player_id, weapon_index, ammo });
    }
    Ok(result.outcome)
}

/// Start player reload. A rejected reload resyncs the owner's ammo.
pub fn start_reload(
    lobby: &mut Lobby,
    player_id: PlayerId,
) -> Result<ReloadMode, &'static str> {
    let now = lobby.clock;
    let player = lobby.players.get_mut(&player_id)
        .ok_or("Player not found")?;

    let result = if player.is_dead {
        Err(ReloadRejected::Dead)
    } else {
        player.inventory.start_reload(now)
    };

    let mode = match result {
        Ok(mode) => mode,
        Err(e) => {
            let weapon_index = player.inventory.current_index();
            let ammo = player.inventory.current().ammo();
            lobby.emit(SyncEvent::AmmoSync { player_id, weapon_index, ammo });
            return Err(match e {
                ReloadRejected::Dead => "Player is dead",
                ReloadRejected::PullingOut => "Weapon is being pulled out",
                ReloadRejected::AlreadyReloading => "Already reloading",
                ReloadRejected::MagazineFull => "Magazine full",
                ReloadRejected::NoMagazine => "Weapon has no magazine",
            });
        }
    };

    lobby.mark_dirty(player_id);
    Ok(mode)
}

/// Switch player weapon slot
pub fn switch_weapon(
    lobby: &mut Lobby,
    player_id: PlayerId,
    slot: usize,
    force: bool,
) -> Result<SwitchResult, &'static str> {
    let now = lobby.clock;
    let player = lobby.players.get_mut(&player_id)
        .ok_or("Player not found")?;

    let switch = player.inventory.switch_to(slot, now, force).map_err(|e| match e {
        SwitchRejected::InvalidIndex => "Invalid weapon slot",
        SwitchRejected::SameSlot => "Weapon already equipped",
    })?;

    lobby.mark_dirty(player_id);
    Ok(switch)
}

/// Animation-driven pull-out completion from the owner
pub fn complete_pull_out(
    lobby: &mut Lobby,
    player_id: PlayerId,
    token: PullOutToken,
) -> Result<bool, &'static str> {
    let player = lobby.players.get_mut(&player_id)
        .ok_or("Player not found")?;
    Ok(player.inventory.complete_pull_out(token))
}

/// Validate and apply one damage request from `shooter_id`
pub fn apply_damage(
    lobby: &mut Lobby,
    shooter_id: PlayerId,
    request: &DamageRequest,
    config: &Config,
) -> Result<HitOutcome, &'static str> {
    if request.target == shooter_id {
        return Err("Self damage");
    }

    let shooter = lobby.players.get(&shooter_id)
        .ok_or("Shooter not found")?;
    let target = lobby.players.get(&request.target)
        .ok_or("Target not found")?;

    if target.is_dead {
        return Err("Target already dead");
    }

    let weapon = shooter.inventory.weapon(request.weapon_index)
        .ok_or("Invalid weapon slot")?;

    if request.shot_seq >= shooter.fired_seq_limit {
        return Err("Shot sequence never fired");
    }
    if !shooter.damage_window.is_fresh(request.shot_seq) {
        return Err("Duplicate shot sequence");
    }

    if !damage_allowed(lobby.game_mode, shooter.team, target.team) {
        return Err("Friendly fire disabled");
    }

    if !request.damage.is_finite() || request.damage <= 0.0 {
        return Err("Invalid damage amount");
    }

    if config.validate_line_of_sight {
        let eye = shooter.position + Vec3::Y * EYE_HEIGHT;
        if !lobby.world.check_line_of_sight(eye, request.hit_point) {
            return Err("No line of sight");
        }
    }

    let def = weapon.definition();
    let limit = (def.max_hit_damage(weapon.multiplier()) * config.damage_tolerance)
        .min(def.damage.damage_cap);
    let damage = request.damage.min(limit);
    if damage < request.damage {
        log::debug!(
            "Clamped damage from player {} ({} -> {})",
            shooter_id, request.damage, damage
        );
    }

    let now = lobby.clock;

    if let Some(shooter) = lobby.players.get_mut(&shooter_id) {
        shooter.damage_window.accept(request.shot_seq);
    }

    let target = lobby.players.get_mut(&request.target)
        .ok_or("Target not found")?;
    target.health = (target.health - damage).max(0.0);
    let was_kill = target.health <= 0.0;
    if was_kill {
        target.is_dead = true;
        target.deaths += 1;
        target.respawn_at = Some(now + f64::from(config.respawn_delay_secs));
        target.inventory.cancel_reload();
    }
    lobby.mark_dirty(request.target);

    if was_kill {
        if let Some(shooter) = lobby.players.get_mut(&shooter_id) {
            shooter.kills += 1;
        }
        log::info!("Player {} killed player {}", shooter_id, request.target);
        lobby.emit(SyncEvent::PlayerKilled { victim: request.target, killer: shooter_id });
    }

    lobby.emit(SyncEvent::HitConfirm {
        shooter: shooter_id,
        target: request.target,
        damage,
        was_kill,
        shot_seq: request.shot_seq,
    });

    Ok(HitOutcome { damage, was_kill })
}

/// Fan out a cosmetic shot to everyone but the shooter
pub fn relay_shot_fx(lobby: &mut Lobby, player_id: PlayerId, fx: ShotFx) -> Result<(), &'static str> {
    if !lobby.players.contains_key(&player_id) {
        return Err("Player not found");
    }
    lobby.emit(SyncEvent::ShotFx { player_id, fx });
    Ok(())
}

pub fn relay_world_sfx(
    lobby: &mut Lobby,
    player_id: PlayerId,
    key: SoundKey,
    attach_to_self: bool,
    allow_overlap: bool,
) -> Result<(), &'static str> {
    if !lobby.players.contains_key(&player_id) {
        return Err("Player not found");
    }
    lobby.emit(SyncEvent::WorldSfx { player_id, key, attach_to_self, allow_overlap });
    Ok(())
}

pub fn relay_stop_sfx(lobby: &mut Lobby, player_id: PlayerId, key: SoundKey) -> Result<(), &'static str> {
    if !lobby.players.contains_key(&player_id) {
        return Err("Player not found");
    }
    lobby.emit(SyncEvent::StopSfx { player_id, key });
    Ok(())
}

/// Advance reload and pull-out timers on every player's active weapon.
/// Returns players whose reload progressed.
pub fn update_weapon_timers(lobby: &mut Lobby) -> Vec<PlayerId> {
    let now = lobby.clock;
    let mut reloaded: Vec<(PlayerId, usize, u32)> = Vec::new();

    for player in lobby.players.values_mut() {
        for event in player.inventory.tick(now) {
            match event {
                InventoryEvent::Weapon(WeaponEvent::RoundLoaded { ammo })
                | InventoryEvent::Weapon(WeaponEvent::ReloadCompleted { ammo }) => {
                    reloaded.push((player.id, player.inventory.current_index(), ammo));
                }
                InventoryEvent::PullOutFinished { slot, timed_out } => {
                    if timed_out {
                        log::debug!("Player {} pull-out of slot {} timed out", player.id, slot);
                    }
                }
            }
        }
    }

    // Second pass: mark dirty (after mutable borrow is released)
    for (player_id, weapon_index, ammo) in &reloaded {
        lobby.mark_dirty(*player_id);
        lobby.emit(SyncEvent::AmmoSync {
            player_id: *player_id,
            weapon_index: *weapon_index,
            ammo: *ammo,
        });
    }

    reloaded.into_iter().map(|(player_id, _, _)| player_id).collect()
}

/// Step every player's damage multiplier from reported velocity and publish
/// through each player's broadcast gate
pub fn update_multipliers(lobby: &mut Lobby, dt: f32) {
    let now = lobby.clock;
    let mut changed = Vec::new();

    for player in lobby.players.values_mut() {
        let speed = player.velocity.length();
        let value = player.inventory.update_multiplier(speed, player.is_dead, dt);
        if let Some(multiplier) = player.multiplier_gate.offer(now, value) {
            changed.push(SyncEvent::MultiplierChanged { player_id: player.id, multiplier });
        }
    }

    for event in changed {
        lobby.emit(event);
    }
}

/// Bring back players whose respawn delay has elapsed
pub fn update_respawns(lobby: &mut Lobby) -> Vec<PlayerId> {
    let now = lobby.clock;
    let mut respawned = Vec::new();

    for player in lobby.players.values_mut() {
        let Some(respawn_at) = player.respawn_at else {
            continue;
        };
        if now < respawn_at {
            continue;
        }
        player.respawn_at = None;
        player.is_dead = false;
        player.health = player.max_health;
        player.position = SPAWN_POINT;
        player.velocity = Vec3::ZERO;
        player.inventory.respawn();
        respawned.push(player.id);
    }

    for player_id in &respawned {
        lobby.mark_dirty(*player_id);
        lobby.emit(SyncEvent::PlayerRespawned { player_id: *player_id, position: SPAWN_POINT });
    }

    respawned
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::lobbies;
    use crate::domain::relay::GameMode;
    use crate::domain::BodyPart;
    use crate::utils::weapondb::WeaponDb;

    fn lobby_with_players(mode: GameMode, teams: [Option<u8>; 2]) -> (Lobby, Config) {
        let mut lobby = Lobby::new("TEST".to_string(), 4, "flat".to_string(), mode);
        let weapons = WeaponDb::load();
        let config = Config::default();
        lobbies::add_player(&mut lobby, 1, "Shooter".to_string(), teams[0], &weapons, &config).unwrap();
        lobbies::add_player(&mut lobby, 2, "Target".to_string(), teams[1], &weapons, &config).unwrap();
        lobby.players.get_mut(&2).unwrap().position = Vec3::new(0.0, 0.0, 10.0);
        lobby.take_events();
        (lobby, config)
    }

    fn fire_at(first_shot_seq: u64, fired_at: f64) -> FireAction {
        FireAction {
            weapon_index: 0,
            origin: Vec3::new(0.0, 1.65, 0.0),
            direction: Vec3::Z,
            first_shot_seq,
            pellet_count: 1,
            fired_at,
        }
    }

    /// Shots spaced a full second apart on the shooter's clock
    fn fire(first_shot_seq: u64) -> FireAction {
        fire_at(first_shot_seq, first_shot_seq as f64)
    }

    fn hit(damage: f32, shot_seq: u64) -> DamageRequest {
        DamageRequest {
            target: 2,
            damage,
            hit_point: Vec3::new(0.0, 1.15, 9.55),
            hit_direction: Vec3::Z,
            body_part: Some(BodyPart::Torso),
            is_headshot: false,
            weapon_index: 0,
            shot_seq,
        }
    }

    #[test]
    fn test_fire_consumes_server_ammo() {
        let (mut lobby, _config) = lobby_with_players(GameMode::FreeForAll, [None, None]);
        let outcome = handle_fire(&mut lobby, 1, &fire(1)).unwrap();
        assert_eq!(outcome, FireOutcome::Fired { ammo: 29 });
        assert_eq!(lobby.players[&1].fired_seq_limit, 2);
        assert!(lobby.take_events().is_empty());
    }

    #[test]
    fn test_rejected_fire_resyncs_ammo() {
        let (mut lobby, config) = lobby_with_players(GameMode::FreeForAll, [None, None]);
        handle_fire(&mut lobby, 1, &fire_at(1, 0.0)).unwrap();
        lobby.clock = 0.01;
        let outcome = handle_fire(&mut lobby, 1, &fire_at(2, 0.01)).unwrap();
        assert_eq!(outcome, FireOutcome::RateLimited);
        assert_eq!(
            lobby.take_events(),
            vec![SyncEvent::AmmoSync { player_id: 1, weapon_index: 0, ammo: 29 }]
        );
        // seq 2 was never fired on the server
        assert_eq!(apply_damage(&mut lobby, 1, &hit(20.0, 2), &config), Err("Shot sequence never fired"));
    }

    #[test]
    fn test_fire_rejects_wrong_slot_and_replayed_sequence() {
        let (mut lobby, _config) = lobby_with_players(GameMode::FreeForAll, [None, None]);
        let mut action = fire(1);
        action.weapon_index = 1;
        assert!(handle_fire(&mut lobby, 1, &action).is_err());

        handle_fire(&mut lobby, 1, &fire(5)).unwrap();
        lobby.clock = 1.0;
        assert_eq!(
            handle_fire(&mut lobby, 1, &fire(3)),
            Err("Stale shot sequence")
        );
        assert_eq!(
            handle_fire(&mut lobby, 1, &fire_at(9, f64::NAN)),
            Err("Invalid fire time")
        );
    }

    #[test]
    fn test_delayed_first_packet_keeps_both_hits() {
        let (mut lobby, config) = lobby_with_players(GameMode::FreeForAll, [None, None]);

        // fired 0.1s apart, first packet 40ms late
        lobby.clock = 0.04;
        assert_eq!(handle_fire(&mut lobby, 1, &fire_at(1, 0.0)), Ok(FireOutcome::Fired { ammo: 29 }));
        lobby.clock = 0.10;
        assert_eq!(handle_fire(&mut lobby, 1, &fire_at(2, 0.1)), Ok(FireOutcome::Fired { ammo: 28 }));

        assert!(apply_damage(&mut lobby, 1, &hit(20.0, 1), &config).is_ok());
        assert!(apply_damage(&mut lobby, 1, &hit(20.0, 2), &config).is_ok());
        assert_eq!(lobby.players[&2].health, 60.0);
    }

    #[test]
    fn test_sustained_fire_with_jittered_arrivals() {
        let (mut lobby, config) = lobby_with_players(GameMode::FreeForAll, [None, None]);
        let arrivals = [0.04, 0.10, 0.23, 0.30, 0.445, 0.50, 0.62, 0.70, 0.84, 0.90];

        // rifle at exactly its 10 rps
        for (i, arrival) in arrivals.iter().enumerate() {
            let seq = i as u64 + 1;
            lobby.clock = *arrival;
            let outcome = handle_fire(&mut lobby, 1, &fire_at(seq, i as f64 * 0.1)).unwrap();
            assert_eq!(outcome, FireOutcome::Fired { ammo: 29 - i as u32 });
            assert!(apply_damage(&mut lobby, 1, &hit(5.0, seq), &config).is_ok());
        }
        assert_eq!(lobby.players[&2].health, 50.0);
        assert!(lobby.take_events().iter().all(|e| !matches!(e, SyncEvent::AmmoSync { .. })));
    }

    #[test]
    fn test_shots_closer_than_fire_interval_rejected() {
        let (mut lobby, _config) = lobby_with_players(GameMode::FreeForAll, [None, None]);
        handle_fire(&mut lobby, 1, &fire_at(1, 0.0)).unwrap();
        lobby.clock = 0.5;
        assert_eq!(handle_fire(&mut lobby, 1, &fire_at(2, 0.05)), Ok(FireOutcome::RateLimited));
        assert_eq!(handle_fire(&mut lobby, 1, &fire_at(2, 0.1)), Ok(FireOutcome::Fired { ammo: 28 }));
    }

    #[test]
    fn test_fire_budget_caps_bunched_packets() {
        let (mut lobby, _config) = lobby_with_players(GameMode::FreeForAll, [None, None]);
        lobby.clock = 1.0;
        // claimed times are legal but all land in one tick
        for i in 0..3 {
            let outcome = handle_fire(&mut lobby, 1, &fire_at(i + 1, i as f64 * 0.1)).unwrap();
            assert!(matches!(outcome, FireOutcome::Fired { .. }));
        }
        assert_eq!(handle_fire(&mut lobby, 1, &fire_at(4, 0.3)), Ok(FireOutcome::RateLimited));
        assert_eq!(lobby.players[&1].fired_seq_limit, 4);

        lobby.clock = 1.1;
        assert_eq!(handle_fire(&mut lobby, 1, &fire_at(4, 0.3)), Ok(FireOutcome::Fired { ammo: 26 }));
    }

    #[test]
    fn test_apply_damage_and_confirm() {
        let (mut lobby, config) = lobby_with_players(GameMode::FreeForAll, [None, None]);
        handle_fire(&mut lobby, 1, &fire(1)).unwrap();

        let outcome = apply_damage(&mut lobby, 1, &hit(20.0, 1), &config).unwrap();
        assert_eq!(outcome, HitOutcome { damage: 20.0, was_kill: false });
        assert_eq!(lobby.players[&2].health, 80.0);
        assert!(lobby.dirty_players.contains(&2));
        assert_eq!(
            lobby.take_events(),
            vec![SyncEvent::HitConfirm { shooter: 1, target: 2, damage: 20.0, was_kill: false, shot_seq: 1 }]
        );
    }

    #[test]
    fn test_duplicate_damage_applied_once() {
        let (mut lobby, config) = lobby_with_players(GameMode::FreeForAll, [None, None]);
        handle_fire(&mut lobby, 1, &fire(1)).unwrap();

        apply_damage(&mut lobby, 1, &hit(20.0, 1), &config).unwrap();
        assert_eq!(apply_damage(&mut lobby, 1, &hit(20.0, 1), &config), Err("Duplicate shot sequence"));
        assert_eq!(lobby.players[&2].health, 80.0);
    }

    #[test]
    fn test_inflated_damage_is_clamped() {
        let (mut lobby, config) = lobby_with_players(GameMode::FreeForAll, [None, None]);
        handle_fire(&mut lobby, 1, &fire(1)).unwrap();

        // rifle at baseline multiplier: 20 * 1.1 tolerance
        let outcome = apply_damage(&mut lobby, 1, &hit(500.0, 1), &config).unwrap();
        assert!((outcome.damage - 22.0).abs() < 1e-4);
    }

    #[test]
    fn test_friendly_fire_rejected_in_team_mode() {
        let (mut lobby, config) = lobby_with_players(GameMode::TeamDeathmatch, [Some(0), Some(0)]);
        handle_fire(&mut lobby, 1, &fire(1)).unwrap();
        assert_eq!(apply_damage(&mut lobby, 1, &hit(20.0, 1), &config), Err("Friendly fire disabled"));
        assert_eq!(lobby.players[&2].health, 100.0);
    }

    #[test]
    fn test_self_damage_and_invalid_amounts_rejected() {
        let (mut lobby, config) = lobby_with_players(GameMode::FreeForAll, [None, None]);
        handle_fire(&mut lobby, 1, &fire(1)).unwrap();

        let mut request = hit(20.0, 1);
        request.target = 1;
        assert_eq!(apply_damage(&mut lobby, 1, &request, &config), Err("Self damage"));
        assert!(apply_damage(&mut lobby, 1, &hit(f32::NAN, 1), &config).is_err());
        assert!(apply_damage(&mut lobby, 1, &hit(-5.0, 1), &config).is_err());
        // rejected requests do not burn the sequence
        assert!(apply_damage(&mut lobby, 1, &hit(20.0, 1), &config).is_ok());
    }

    #[test]
    fn test_line_of_sight_blocks_damage() {
        let mut lobby = Lobby::new("TEST".to_string(), 4, "arena".to_string(), GameMode::FreeForAll);
        let weapons = WeaponDb::load();
        let config = Config::default();
        lobbies::add_player(&mut lobby, 1, "Shooter".to_string(), None, &weapons, &config).unwrap();
        lobbies::add_player(&mut lobby, 2, "Target".to_string(), None, &weapons, &config).unwrap();
        handle_fire(&mut lobby, 1, &fire(1)).unwrap();

        // wall spans z 20..22 in front of the shooter
        let mut request = hit(20.0, 1);
        request.hit_point = Vec3::new(0.0, 1.15, 30.0);
        assert_eq!(apply_damage(&mut lobby, 1, &request, &config), Err("No line of sight"));
    }

    #[test]
    fn test_kill_and_respawn() {
        let (mut lobby, config) = lobby_with_players(GameMode::FreeForAll, [None, None]);
        lobby.players.get_mut(&2).unwrap().health = 10.0;
        handle_fire(&mut lobby, 1, &fire(1)).unwrap();

        let outcome = apply_damage(&mut lobby, 1, &hit(20.0, 1), &config).unwrap();
        assert!(outcome.was_kill);
        assert_eq!(outcome.damage, 20.0);
        let target = &lobby.players[&2];
        assert!(target.is_dead);
        assert_eq!(target.health, 0.0);
        assert_eq!(lobby.players[&1].kills, 1);

        let events = lobby.take_events();
        assert!(events.contains(&SyncEvent::PlayerKilled { victim: 2, killer: 1 }));

        // dead players take no damage and cannot fire
        lobby.clock = 1.0;
        handle_fire(&mut lobby, 1, &fire(2)).unwrap();
        assert_eq!(apply_damage(&mut lobby, 1, &hit(20.0, 2), &config), Err("Target already dead"));
        assert!(handle_fire(&mut lobby, 2, &fire(1)).is_err());

        lobby.clock = 2.0;
        assert!(update_respawns(&mut lobby).is_empty());
        lobby.clock = 3.0;
        assert_eq!(update_respawns(&mut lobby), vec![2]);
        let target = &lobby.players[&2];
        assert!(!target.is_dead);
        assert_eq!(target.health, 100.0);
        assert_eq!(target.inventory.current().ammo(), 30);
    }

    #[test]
    fn test_reload_timer_syncs_ammo() {
        let (mut lobby, _config) = lobby_with_players(GameMode::FreeForAll, [None, None]);
        handle_fire(&mut lobby, 1, &fire(1)).unwrap();
        assert_eq!(start_reload(&mut lobby, 1), Ok(ReloadMode::Mag));
        assert_eq!(start_reload(&mut lobby, 1), Err("Already reloading"));
        assert_eq!(
            lobby.take_events(),
            vec![SyncEvent::AmmoSync { player_id: 1, weapon_index: 0, ammo: 29 }]
        );

        lobby.clock = 1.0;
        assert!(update_weapon_timers(&mut lobby).is_empty());
        lobby.clock = 1.8;
        assert_eq!(update_weapon_timers(&mut lobby), vec![1]);
        assert_eq!(
            lobby.take_events(),
            vec![SyncEvent::AmmoSync { player_id: 1, weapon_index: 0, ammo: 30 }]
        );
    }

    #[test]
    fn test_dead_player_reload_resyncs_ammo() {
        let (mut lobby, _config) = lobby_with_players(GameMode::FreeForAll, [None, None]);
        handle_fire(&mut lobby, 1, &fire(1)).unwrap();
        lobby.players.get_mut(&1).unwrap().is_dead = true;

        assert_eq!(start_reload(&mut lobby, 1), Err("Player is dead"));
        assert!(!lobby.players[&1].inventory.current().is_reloading());
        assert_eq!(
            lobby.take_events(),
            vec![SyncEvent::AmmoSync { player_id: 1, weapon_index: 0, ammo: 29 }]
        );
        assert_eq!(start_reload(&mut lobby, 9), Err("Player not found"));
        assert!(lobby.take_events().is_empty());
    }

    #[test]
    fn test_switch_and_pull_out() {
        let (mut lobby, _config) = lobby_with_players(GameMode::FreeForAll, [None, None]);
        assert_eq!(switch_weapon(&mut lobby, 1, 0, false), Err("Weapon already equipped"));
        assert_eq!(switch_weapon(&mut lobby, 1, 5, false), Err("Invalid weapon slot"));

        let switch = switch_weapon(&mut lobby, 1, 1, false).unwrap();
        assert_eq!(start_reload(&mut lobby, 1), Err("Weapon is being pulled out"));
        assert_eq!(complete_pull_out(&mut lobby, 1, PullOutToken(99)), Ok(false));
        assert_eq!(complete_pull_out(&mut lobby, 1, switch.token), Ok(true));
        assert_eq!(lobby.players[&1].to_sync_state().current_weapon_id, 2);
    }

    #[test]
    fn test_multiplier_broadcast_is_gated() {
        let (mut lobby, _config) = lobby_with_players(GameMode::FreeForAll, [None, None]);
        lobby.players.get_mut(&1).unwrap().velocity = Vec3::new(28.0, 0.0, 0.0);

        let mut sent = 0;
        for _ in 0..50 {
            lobby.advance_clock(0.02);
            update_multipliers(&mut lobby, 0.02);
            sent += lobby
                .take_events()
                .iter()
                .filter(|e| matches!(e, SyncEvent::MultiplierChanged { player_id: 1, .. }))
                .count();
        }
        // one second at 0.1s minimum interval, plus the initial send
        assert!(sent >= 2 && sent <= 11);
        assert!(lobby.players[&1].inventory.current().multiplier() > 1.9);
    }

    #[test]
    fn test_cosmetics_need_a_known_player() {
        let (mut lobby, _config) = lobby_with_players(GameMode::FreeForAll, [None, None]);
        assert!(relay_stop_sfx(&mut lobby, 9, SoundKey::Reload).is_err());
        relay_world_sfx(&mut lobby, 1, SoundKey::Shoot, true, true).unwrap();
        assert_eq!(lobby.take_events().len(), 1);
    }
}
