use engine::{Entity, EntityId, SaveStore, Vec3, World};
use tracing::{debug, error, info, warn};

use super::actors::{
    apply_facing, enemy_desc, spawn_player, vec3, EnemyKind, EnemyRegistry, PlayerControl, Score,
};
use super::coordinator::LoadOutcome;
use super::error::GameError;
use super::snapshot::{apply_snapshot, validate_snapshot, WorldSnapshot};
use crate::app::config::GameConfig;

/// Everything the flow states and the snapshot code operate on. The world
/// owns the entities; the player handle and enemy registry only refer to them.
pub struct GameContext {
    pub(crate) world: World,
    pub(crate) player: Option<PlayerControl>,
    pub(crate) enemies: EnemyRegistry,
    pub(crate) score: Score,
    pub(crate) config: GameConfig,
    pub(crate) saves: SaveStore,
    pub(crate) level_ready: bool,
    pub(crate) pending_restore: Option<LoadOutcome>,
    restore_count: u32,
}

impl GameContext {
    pub(crate) fn new(config: GameConfig, saves: SaveStore) -> Self {
        Self {
            world: World::default(),
            player: None,
            enemies: EnemyRegistry::default(),
            score: Score::default(),
            config,
            saves,
            level_ready: false,
            pending_restore: None,
            restore_count: 0,
        }
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    pub fn saves(&self) -> &SaveStore {
        &self.saves
    }

    pub fn enemies(&self) -> &EnemyRegistry {
        &self.enemies
    }

    pub fn score(&self) -> u32 {
        self.score.current()
    }

    pub fn level_ready(&self) -> bool {
        self.level_ready
    }

    /// How many times a persisted snapshot has been applied to this context.
    pub fn restore_count(&self) -> u32 {
        self.restore_count
    }

    pub fn player(&self) -> Option<PlayerControl> {
        self.player
    }

    pub fn player_entity(&self) -> Option<&Entity> {
        self.player
            .and_then(|player| self.world.find_entity(player.id))
    }

    pub(crate) fn player_entity_mut(&mut self) -> Option<&mut Entity> {
        let player = self.player?;
        self.world.find_entity_mut(player.id)
    }

    pub fn enemy_entities(&self) -> impl Iterator<Item = &Entity> + '_ {
        self.enemies
            .ids()
            .iter()
            .filter_map(|id| self.world.find_entity(*id))
    }

    pub(crate) fn reset_world(&mut self) {
        self.world.clear();
        self.enemies.clear();
        self.player = None;
        self.level_ready = false;
    }

    pub(crate) fn build_level(&mut self) {
        self.reset_world();

        let player_id = spawn_player(&mut self.world, &self.config.player);
        self.player = Some(PlayerControl {
            id: player_id,
            facing_right: true,
        });
        for placement in &self.config.level_enemies {
            let archetype = self.config.archetype(placement.kind);
            let id = self.world.spawn(enemy_desc(
                placement.kind,
                archetype,
                vec3(placement.position),
            ));
            self.enemies.register(id);
        }
        self.world.apply_pending();
        self.score.set(0);
        self.level_ready = true;

        info!(
            player = player_id.0,
            enemy_count = self.enemies.len(),
            "level_built"
        );
    }

    pub(crate) fn freeze(&mut self) {
        for entity in self.world.entities_mut() {
            entity.velocity = Vec3::ZERO;
        }
    }

    /// Spawns an enemy of `kind` at `position` and registers it.
    pub fn spawn_enemy(&mut self, kind: EnemyKind, position: Vec3) -> EntityId {
        let desc = enemy_desc(kind, self.config.archetype(kind), position);
        let id = self.world.spawn(desc);
        self.world.apply_pending();
        self.enemies.register(id);
        debug!(enemy = id.0, kind = ?kind, "enemy_spawned");
        id
    }

    pub fn register_enemy(&mut self, id: EntityId) -> Result<bool, GameError> {
        let entity = self
            .world
            .find_entity(id)
            .ok_or(GameError::UnknownEntity(id))?;
        if EnemyKind::from_archetype_name(&entity.archetype).is_none() {
            return Err(GameError::NotAnEnemy {
                id,
                archetype: entity.archetype.clone(),
            });
        }
        Ok(self.enemies.register(id))
    }

    pub fn unregister_enemy(&mut self, id: EntityId) -> bool {
        self.enemies.unregister(id)
    }

    /// Applies damage; an enemy brought to zero health is unregistered,
    /// despawned and scored. Returns whether it died.
    pub fn damage_enemy(&mut self, id: EntityId, amount: u32) -> Result<bool, GameError> {
        if !self.enemies.contains(id) {
            return Err(GameError::UnknownEntity(id));
        }
        let entity = self
            .world
            .find_entity_mut(id)
            .ok_or(GameError::UnknownEntity(id))?;
        entity.health = entity.health.saturating_sub(amount);
        if entity.health > 0 {
            return Ok(false);
        }

        self.enemies.unregister(id);
        self.world.despawn(id);
        self.world.apply_pending();
        self.score.add(self.config.score_per_kill);
        info!(enemy = id.0, score = self.score.current(), "enemy_defeated");
        Ok(true)
    }

    pub fn set_player_facing(&mut self, facing_right: bool) -> Result<(), GameError> {
        let player = self.player.as_mut().ok_or(GameError::MissingPlayer)?;
        player.facing_right = facing_right;
        let entity = self
            .player_entity_mut()
            .ok_or(GameError::MissingPlayer)?;
        apply_facing(entity, facing_right);
        Ok(())
    }

    pub(crate) fn set_score(&mut self, value: u32) {
        self.score.set(value);
    }

    /// Reads the save slot and applies it. Decoding and validation happen
    /// before the world is touched, so every failure leaves the freshly
    /// built level as it was.
    pub(crate) fn restore_from_save(&mut self) -> LoadOutcome {
        let snapshot = match self.saves.restore::<WorldSnapshot>() {
            Ok(snapshot) => snapshot,
            Err(error) if error.is_no_save_data() => {
                info!(path = %self.saves.path().display(), "no_save_data");
                return LoadOutcome::NoSaveData;
            }
            Err(error) if error.is_corrupt() => {
                return self.discard_corrupt_save(error.to_string());
            }
            Err(error) => {
                warn!(error = %error, "load_failed");
                return LoadOutcome::Failed {
                    reason: error.to_string(),
                };
            }
        };
        if let Err(message) = validate_snapshot(&snapshot) {
            return self.discard_corrupt_save(message);
        }

        match apply_snapshot(&snapshot, self) {
            Ok(enemy_count) => {
                self.restore_count = self.restore_count.saturating_add(1);
                LoadOutcome::Restored { enemy_count }
            }
            Err(error) => {
                warn!(error = %error, "load_apply_failed");
                LoadOutcome::Failed {
                    reason: error.to_string(),
                }
            }
        }
    }

    fn discard_corrupt_save(&mut self, reason: String) -> LoadOutcome {
        error!(
            path = %self.saves.path().display(),
            reason = %reason,
            "corrupt_save_discarded"
        );
        if let Err(discard_error) = self.saves.discard() {
            warn!(error = %discard_error, "corrupt_save_discard_failed");
        }
        LoadOutcome::CorruptSaveDiscarded { reason }
    }
}
