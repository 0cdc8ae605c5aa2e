use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::{from_reader, to_writer_pretty};

use super::patch::{ActionPatch, CyclePatch, GroupPatch, ScenePatch, ShowPatch};
use super::store::{HierarchyStore, StoreError};
use crate::show::show::{
    Action, ActionId, Cycle, CycleId, Device, DeviceId, GlobalOverrides, GlobalParameter, Group,
    GroupId, Scene, SceneId, Show, ShowId,
};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ShowRecord {
    #[serde(default)]
    pub id: ShowId,
    pub name: String,
    #[serde(default)]
    pub topic: String,
    #[serde(default)]
    pub repeat: bool,
    #[serde(default)]
    pub globals: GlobalOverrides,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CycleRecord {
    #[serde(default)]
    pub id: CycleId,
    pub show_id: ShowId,
    pub scene_id: SceneId,
    #[serde(default = "default_scene_cycles")]
    pub scene_cycles: i64,
    #[serde(default)]
    pub end_delay: f64,
    #[serde(default)]
    pub loop_include: bool,
    #[serde(default)]
    pub globals: GlobalOverrides,
}

fn default_scene_cycles() -> i64 {
    1
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SceneRecord {
    #[serde(default)]
    pub id: SceneId,
    pub name: String,
    #[serde(default)]
    pub allowed_devices: Vec<DeviceId>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GroupRecord {
    #[serde(default)]
    pub id: GroupId,
    pub scene_id: SceneId,
    #[serde(default)]
    pub delay: f64,
    #[serde(default)]
    pub global_delay: bool,
    #[serde(default)]
    pub order: i32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ActionRecord {
    #[serde(default)]
    pub id: ActionId,
    pub group_id: GroupId,
    #[serde(default)]
    pub devices: Vec<DeviceId>,
    pub command: String,
    #[serde(default)]
    pub parameter: String,
    /// Kept as text so a bad tag surfaces when the show is loaded for playback.
    #[serde(default)]
    pub global_parameter: String,
    #[serde(default)]
    pub order: i32,
}

/// Everything the store holds, as written to disk.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StoreDocument {
    #[serde(default)]
    pub shows: Vec<ShowRecord>,
    #[serde(default)]
    pub cycles: Vec<CycleRecord>,
    #[serde(default)]
    pub scenes: Vec<SceneRecord>,
    #[serde(default)]
    pub groups: Vec<GroupRecord>,
    #[serde(default)]
    pub actions: Vec<ActionRecord>,
    #[serde(default)]
    pub devices: Vec<Device>,
}

trait Record {
    const KIND: &'static str;
    fn id(&self) -> u64;
    fn set_id(&mut self, id: u64);
}

/// Records with an explicit position among their siblings.
trait Ordered: Record {
    fn parent(&self) -> u64;
    fn order(&self) -> i32;
    fn set_order(&mut self, order: i32);
}

macro_rules! record {
    ($ty:ty, $kind:expr) => {
        impl Record for $ty {
            const KIND: &'static str = $kind;

            fn id(&self) -> u64 {
                self.id
            }

            fn set_id(&mut self, id: u64) {
                self.id = id;
            }
        }
    };
}

record!(ShowRecord, "show");
record!(CycleRecord, "cycle");
record!(SceneRecord, "scene");
record!(GroupRecord, "group");
record!(ActionRecord, "action");
record!(Device, "device");

impl Ordered for GroupRecord {
    fn parent(&self) -> u64 {
        self.scene_id
    }

    fn order(&self) -> i32 {
        self.order
    }

    fn set_order(&mut self, order: i32) {
        self.order = order;
    }
}

impl Ordered for ActionRecord {
    fn parent(&self) -> u64 {
        self.group_id
    }

    fn order(&self) -> i32 {
        self.order
    }

    fn set_order(&mut self, order: i32) {
        self.order = order;
    }
}

fn insert<R: Record>(records: &mut Vec<R>, mut record: R) -> u64 {
    let id = records.iter().map(Record::id).max().unwrap_or(0) + 1;
    record.set_id(id);
    records.push(record);
    id
}

fn find<R: Record>(records: &[R], id: u64) -> Result<&R, StoreError> {
    records
        .iter()
        .find(|r| r.id() == id)
        .ok_or_else(|| StoreError::not_found(R::KIND, id))
}

fn find_mut<R: Record>(records: &mut [R], id: u64) -> Result<&mut R, StoreError> {
    records
        .iter_mut()
        .find(|r| r.id() == id)
        .ok_or_else(|| StoreError::not_found(R::KIND, id))
}

fn remove<R: Record>(records: &mut Vec<R>, id: u64) -> Result<R, StoreError> {
    let index = records
        .iter()
        .position(|r| r.id() == id)
        .ok_or_else(|| StoreError::not_found(R::KIND, id))?;
    Ok(records.remove(index))
}

/// Children of `parent`, ascending by order with ties broken by id.
fn children<R: Ordered + Clone>(records: &[R], parent: u64) -> Vec<R> {
    let mut children: Vec<R> = records
        .iter()
        .filter(|r| r.parent() == parent)
        .cloned()
        .collect();
    children.sort_by_key(|r| (r.order(), r.id()));
    children
}

fn next_order<R: Ordered>(records: &[R], parent: u64) -> i32 {
    records.iter().filter(|r| r.parent() == parent).count() as i32 + 1
}

/// Moves `id` to 1-based `position` among its siblings and renumbers the
/// rest around it.
fn reorder<R: Ordered + Clone>(
    records: &mut [R],
    parent: u64,
    id: u64,
    position: i32,
) -> Result<(), StoreError> {
    if find(records, id)?.parent() != parent {
        return Err(StoreError::invalid(
            R::KIND,
            id,
            format!("does not belong to parent {}", parent),
        ));
    }

    let siblings: Vec<u64> = children(records, parent)
        .iter()
        .map(Record::id)
        .filter(|sibling| *sibling != id)
        .collect();

    let mut order = 1;
    for sibling in siblings {
        if order == position {
            order += 1;
        }
        find_mut(records, sibling)?.set_order(order);
        order += 1;
    }
    find_mut(records, id)?.set_order(position);

    Ok(())
}

fn check_delay(kind: &'static str, id: u64, field: &str, value: f64) -> Result<(), StoreError> {
    if !value.is_finite() || value < 0.0 {
        return Err(StoreError::invalid(
            kind,
            id,
            format!("{} must be a non-negative number of seconds, got {}", field, value),
        ));
    }
    Ok(())
}

/// Hierarchy store kept in memory and persisted as a single JSON document.
#[derive(Default)]
pub struct MemoryStore {
    doc: RwLock<StoreDocument>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_document(doc: StoreDocument) -> Self {
        Self {
            doc: RwLock::new(doc),
        }
    }

    pub fn load(path: &Path) -> Result<Self, StoreError> {
        let file = File::open(path)?;
        let doc: StoreDocument = from_reader(BufReader::new(file))?;
        log::info!(
            "Loaded {} shows and {} scenes from {}",
            doc.shows.len(),
            doc.scenes.len(),
            path.display()
        );
        Ok(Self::from_document(doc))
    }

    pub fn save(&self, path: &Path) -> Result<(), StoreError> {
        let mut writer = BufWriter::new(File::create(path)?);
        to_writer_pretty(&mut writer, &*self.doc.read())?;
        writer.flush()?;
        Ok(())
    }

    pub fn document(&self) -> StoreDocument {
        self.doc.read().clone()
    }

    // Shows

    pub fn add_show(&self, record: ShowRecord) -> ShowId {
        insert(&mut self.doc.write().shows, record)
    }

    pub fn show(&self, id: ShowId) -> Result<ShowRecord, StoreError> {
        find(&self.doc.read().shows, id).cloned()
    }

    pub fn update_show(&self, id: ShowId, patch: &ShowPatch) -> Result<(), StoreError> {
        let mut doc = self.doc.write();
        patch.apply(find_mut(&mut doc.shows, id)?);
        Ok(())
    }

    pub fn delete_show(&self, id: ShowId) -> Result<(), StoreError> {
        let mut doc = self.doc.write();
        remove(&mut doc.shows, id)?;
        doc.cycles.retain(|c| c.show_id != id);
        Ok(())
    }

    // Cycles

    pub fn add_cycle(&self, record: CycleRecord) -> Result<CycleId, StoreError> {
        let mut doc = self.doc.write();
        find(&doc.shows, record.show_id)?;
        find(&doc.scenes, record.scene_id)?;
        Ok(insert(&mut doc.cycles, record))
    }

    pub fn cycle(&self, id: CycleId) -> Result<CycleRecord, StoreError> {
        find(&self.doc.read().cycles, id).cloned()
    }

    /// A show's cycles in the order they were added.
    pub fn cycles_for_show(&self, show_id: ShowId) -> Vec<CycleRecord> {
        self.doc
            .read()
            .cycles
            .iter()
            .filter(|c| c.show_id == show_id)
            .cloned()
            .collect()
    }

    pub fn update_cycle(&self, id: CycleId, patch: &CyclePatch) -> Result<(), StoreError> {
        let mut doc = self.doc.write();
        if let Some(scene_id) = patch.scene_id {
            find(&doc.scenes, scene_id)?;
        }
        patch.apply(find_mut(&mut doc.cycles, id)?);
        Ok(())
    }

    pub fn delete_cycle(&self, id: CycleId) -> Result<(), StoreError> {
        remove(&mut self.doc.write().cycles, id).map(|_| ())
    }

    // Scenes

    pub fn add_scene(&self, record: SceneRecord) -> SceneId {
        insert(&mut self.doc.write().scenes, record)
    }

    pub fn scene(&self, id: SceneId) -> Result<SceneRecord, StoreError> {
        find(&self.doc.read().scenes, id).cloned()
    }

    pub fn scenes(&self) -> Vec<SceneRecord> {
        self.doc.read().scenes.clone()
    }

    pub fn update_scene(&self, id: SceneId, patch: &ScenePatch) -> Result<(), StoreError> {
        let mut doc = self.doc.write();
        patch.apply(find_mut(&mut doc.scenes, id)?);
        Ok(())
    }

    /// Deletes the scene with its groups and their actions. Cycles that
    /// reference it are left in place and fail to load until repointed.
    pub fn delete_scene(&self, id: SceneId) -> Result<(), StoreError> {
        let mut doc = self.doc.write();
        remove(&mut doc.scenes, id)?;

        let groups: Vec<GroupId> = doc
            .groups
            .iter()
            .filter(|g| g.scene_id == id)
            .map(|g| g.id)
            .collect();
        doc.groups.retain(|g| g.scene_id != id);
        doc.actions.retain(|a| !groups.contains(&a.group_id));
        Ok(())
    }

    // Groups

    pub fn add_group(&self, record: GroupRecord) -> Result<GroupId, StoreError> {
        let mut doc = self.doc.write();
        find(&doc.scenes, record.scene_id)?;
        Ok(insert(&mut doc.groups, record))
    }

    pub fn group(&self, id: GroupId) -> Result<GroupRecord, StoreError> {
        find(&self.doc.read().groups, id).cloned()
    }

    pub fn groups_for_scene(&self, scene_id: SceneId) -> Vec<GroupRecord> {
        children(&self.doc.read().groups, scene_id)
    }

    pub fn next_group_order(&self, scene_id: SceneId) -> i32 {
        next_order(&self.doc.read().groups, scene_id)
    }

    pub fn update_group(&self, id: GroupId, patch: &GroupPatch) -> Result<(), StoreError> {
        let mut doc = self.doc.write();
        patch.apply(find_mut(&mut doc.groups, id)?);
        Ok(())
    }

    pub fn sort_group(
        &self,
        scene_id: SceneId,
        group_id: GroupId,
        position: i32,
    ) -> Result<(), StoreError> {
        reorder(&mut self.doc.write().groups, scene_id, group_id, position)
    }

    pub fn delete_group(&self, id: GroupId) -> Result<(), StoreError> {
        let mut doc = self.doc.write();
        remove(&mut doc.groups, id)?;
        doc.actions.retain(|a| a.group_id != id);
        Ok(())
    }

    // Actions

    pub fn add_action(&self, record: ActionRecord) -> Result<ActionId, StoreError> {
        let mut doc = self.doc.write();
        find(&doc.groups, record.group_id)?;
        Ok(insert(&mut doc.actions, record))
    }

    pub fn action(&self, id: ActionId) -> Result<ActionRecord, StoreError> {
        find(&self.doc.read().actions, id).cloned()
    }

    pub fn actions_for_group(&self, group_id: GroupId) -> Vec<ActionRecord> {
        children(&self.doc.read().actions, group_id)
    }

    pub fn next_action_order(&self, group_id: GroupId) -> i32 {
        next_order(&self.doc.read().actions, group_id)
    }

    pub fn update_action(&self, id: ActionId, patch: &ActionPatch) -> Result<(), StoreError> {
        let mut doc = self.doc.write();
        patch.apply(find_mut(&mut doc.actions, id)?);
        Ok(())
    }

    pub fn sort_action(
        &self,
        group_id: GroupId,
        action_id: ActionId,
        position: i32,
    ) -> Result<(), StoreError> {
        reorder(&mut self.doc.write().actions, group_id, action_id, position)
    }

    pub fn delete_action(&self, id: ActionId) -> Result<(), StoreError> {
        remove(&mut self.doc.write().actions, id).map(|_| ())
    }

    // Devices

    pub fn add_device(&self, device: Device) -> DeviceId {
        insert(&mut self.doc.write().devices, device)
    }

    pub fn device(&self, id: DeviceId) -> Result<Device, StoreError> {
        find(&self.doc.read().devices, id).cloned()
    }

    pub fn devices(&self) -> Vec<Device> {
        self.doc.read().devices.clone()
    }

    /// Deletes the device and drops it from every action and scene that
    /// referenced it.
    pub fn delete_device(&self, id: DeviceId) -> Result<(), StoreError> {
        let mut doc = self.doc.write();
        remove(&mut doc.devices, id)?;
        for action in doc.actions.iter_mut() {
            action.devices.retain(|d| *d != id);
        }
        for scene in doc.scenes.iter_mut() {
            scene.allowed_devices.retain(|d| *d != id);
        }
        Ok(())
    }
}

/// The show's own fields, unvalidated. Stop and topic lookups must keep
/// working for a show that can no longer be played.
fn shallow_show(record: &ShowRecord) -> Show {
    Show {
        id: record.id,
        name: record.name.clone(),
        topic: record.topic.clone(),
        repeat: record.repeat,
        globals: record.globals.clone(),
        cycles: Vec::new(),
    }
}

fn resolve_devices(
    doc: &StoreDocument,
    kind: &'static str,
    owner: u64,
    ids: &[DeviceId],
) -> Result<Vec<Device>, StoreError> {
    ids.iter()
        .map(|id| {
            find(&doc.devices, *id).cloned().map_err(|_| {
                StoreError::invalid(kind, owner, format!("references missing device {}", id))
            })
        })
        .collect()
}

fn assemble_action(doc: &StoreDocument, record: &ActionRecord) -> Result<Action, StoreError> {
    let global_parameter: GlobalParameter = record
        .global_parameter
        .parse()
        .map_err(|e: String| StoreError::invalid("action", record.id, e))?;

    Ok(Action {
        id: record.id,
        group_id: record.group_id,
        devices: resolve_devices(doc, "action", record.id, &record.devices)?,
        command: record.command.clone(),
        parameter: record.parameter.clone(),
        global_parameter,
        order: record.order,
    })
}

fn assemble_group(doc: &StoreDocument, record: &GroupRecord) -> Result<Group, StoreError> {
    check_delay("group", record.id, "delay", record.delay)?;

    let actions = children(&doc.actions, record.id)
        .iter()
        .map(|a| assemble_action(doc, a))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Group {
        id: record.id,
        scene_id: record.scene_id,
        delay: record.delay,
        global_delay: record.global_delay,
        order: record.order,
        actions,
    })
}

fn assemble_scene(doc: &StoreDocument, id: SceneId) -> Result<Scene, StoreError> {
    let record = find(&doc.scenes, id)?;

    let groups = children(&doc.groups, id)
        .iter()
        .map(|g| assemble_group(doc, g))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Scene {
        id,
        name: record.name.clone(),
        allowed_devices: resolve_devices(doc, "scene", id, &record.allowed_devices)?,
        groups,
    })
}

fn assemble_cycle(doc: &StoreDocument, record: &CycleRecord) -> Result<Cycle, StoreError> {
    let scene_cycles = u32::try_from(record.scene_cycles)
        .ok()
        .filter(|n| *n >= 1)
        .ok_or_else(|| {
            StoreError::invalid(
                "cycle",
                record.id,
                format!("scene_cycles must be at least 1, got {}", record.scene_cycles),
            )
        })?;
    check_delay("cycle", record.id, "end delay", record.end_delay)?;
    if let Some(delay) = record.globals.delay {
        check_delay("cycle", record.id, "global delay", delay)?;
    }

    Ok(Cycle {
        id: record.id,
        show_id: record.show_id,
        scene_id: record.scene_id,
        scene_cycles,
        end_delay: record.end_delay,
        loop_include: record.loop_include,
        globals: record.globals.clone(),
        scene: assemble_scene(doc, record.scene_id)?,
    })
}

impl HierarchyStore for MemoryStore {
    fn get_show_recursive(&self, id: ShowId) -> Result<Show, StoreError> {
        let doc = self.doc.read();
        let record = find(&doc.shows, id)?;
        if let Some(delay) = record.globals.delay {
            check_delay("show", id, "global delay", delay)?;
        }
        let mut show = shallow_show(record);

        show.cycles = doc
            .cycles
            .iter()
            .filter(|c| c.show_id == id)
            .map(|c| assemble_cycle(&doc, c))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(show)
    }

    fn get_show(&self, id: ShowId) -> Result<Show, StoreError> {
        find(&self.doc.read().shows, id).map(shallow_show)
    }

    fn get_show_by_topic(&self, topic: &str) -> Result<Show, StoreError> {
        if topic.is_empty() {
            return Err(StoreError::TopicNotFound(String::new()));
        }

        let doc = self.doc.read();
        let record = doc
            .shows
            .iter()
            .find(|s| s.topic == topic)
            .ok_or_else(|| StoreError::TopicNotFound(topic.to_string()))?;
        Ok(shallow_show(record))
    }

    fn get_shows(&self) -> Result<Vec<Show>, StoreError> {
        Ok(self.doc.read().shows.iter().map(shallow_show).collect())
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    fn device(store: &MemoryStore, topic: &str) -> DeviceId {
        store.add_device(Device {
            id: 0,
            name: topic.to_string(),
            topic: topic.to_string(),
            device_type: 1,
        })
    }

    fn group(store: &MemoryStore, scene_id: SceneId, order: i32) -> GroupId {
        store
            .add_group(GroupRecord {
                scene_id,
                order,
                ..Default::default()
            })
            .unwrap()
    }

    fn action(store: &MemoryStore, group_id: GroupId, device: DeviceId, order: i32) -> ActionId {
        store
            .add_action(ActionRecord {
                group_id,
                devices: vec![device],
                command: "Power".to_string(),
                parameter: "ON".to_string(),
                order,
                ..Default::default()
            })
            .unwrap()
    }

    fn cycle(show_id: ShowId, scene_id: SceneId) -> CycleRecord {
        CycleRecord {
            id: 0,
            show_id,
            scene_id,
            scene_cycles: 1,
            end_delay: 0.0,
            loop_include: true,
            globals: GlobalOverrides::default(),
        }
    }

    fn sample() -> (MemoryStore, ShowId) {
        let store = MemoryStore::new();
        let porch = device(&store, "porch");
        let scene = store.add_scene(SceneRecord {
            name: "Sparkle".to_string(),
            ..Default::default()
        });
        let late = group(&store, scene, 2);
        let early = group(&store, scene, 1);
        action(&store, late, porch, 1);
        action(&store, early, porch, 2);
        action(&store, early, porch, 1);

        let show = store.add_show(ShowRecord {
            name: "Evening".to_string(),
            topic: "evening".to_string(),
            ..Default::default()
        });
        store.add_cycle(cycle(show, scene)).unwrap();
        (store, show)
    }

    #[test]
    fn test_recursive_show_is_ordered() {
        let (store, show_id) = sample();
        let show = store.get_show_recursive(show_id).unwrap();

        assert_eq!(show.cycles.len(), 1);
        let groups = &show.cycles[0].scene.groups;
        assert_eq!(groups.iter().map(|g| g.order).collect::<Vec<_>>(), vec![1, 2]);
        assert_eq!(
            groups[0].actions.iter().map(|a| a.order).collect::<Vec<_>>(),
            vec![1, 2]
        );
        assert_eq!(groups[0].actions[0].devices[0].topic, "porch");
        assert_eq!(show.dispatch_count(), 3);
    }

    #[test]
    fn test_shallow_show_has_no_cycles() {
        let (store, show_id) = sample();
        assert!(store.get_show(show_id).unwrap().cycles.is_empty());
        assert_eq!(store.get_show_by_topic("evening").unwrap().id, show_id);
        assert!(matches!(
            store.get_show_by_topic("morning"),
            Err(StoreError::TopicNotFound(_))
        ));
        assert!(store.get_show_by_topic("").is_err());
    }

    #[test]
    fn test_missing_show_is_not_found() {
        let store = MemoryStore::new();
        assert!(matches!(
            store.get_show_recursive(9),
            Err(StoreError::NotFound { kind: "show", id: 9 })
        ));
    }

    #[test]
    fn test_malformed_data_is_invalid() {
        let (store, show_id) = sample();
        let cycle_id = store.cycles_for_show(show_id)[0].id;
        store.doc.write().cycles[0].scene_cycles = 0;
        assert!(matches!(
            store.get_show_recursive(show_id),
            Err(StoreError::Invalid { kind: "cycle", id, .. }) if id == cycle_id
        ));

        let (store, show_id) = sample();
        store.doc.write().actions[0].global_parameter = "brightness".to_string();
        assert!(matches!(
            store.get_show_recursive(show_id),
            Err(StoreError::Invalid { kind: "action", .. })
        ));

        let (store, show_id) = sample();
        store.doc.write().groups[0].delay = -1.0;
        assert!(matches!(
            store.get_show_recursive(show_id),
            Err(StoreError::Invalid { kind: "group", .. })
        ));
    }

    #[test]
    fn test_bad_show_delay_only_blocks_playback() {
        let (store, show_id) = sample();
        store.doc.write().shows[0].globals.delay = Some(f64::NAN);

        assert!(matches!(
            store.get_show_recursive(show_id),
            Err(StoreError::Invalid { kind: "show", .. })
        ));
        assert_eq!(store.get_show(show_id).unwrap().topic, "evening");
        assert_eq!(store.get_show_by_topic("evening").unwrap().id, show_id);
        assert_eq!(store.get_shows().unwrap().len(), 1);
    }

    #[test]
    fn test_dangling_device_is_invalid() {
        let (store, show_id) = sample();
        store.doc.write().actions[0].devices.push(99);
        assert!(matches!(
            store.get_show_recursive(show_id),
            Err(StoreError::Invalid { kind: "action", .. })
        ));
    }

    #[test]
    fn test_sort_group_renumbers_siblings() {
        let store = MemoryStore::new();
        let scene = store.add_scene(SceneRecord {
            name: "Chase".to_string(),
            ..Default::default()
        });
        let a = group(&store, scene, store.next_group_order(scene));
        let b = group(&store, scene, store.next_group_order(scene));
        let c = group(&store, scene, store.next_group_order(scene));
        assert_eq!(store.next_group_order(scene), 4);

        store.sort_group(scene, c, 1).unwrap();
        let ids: Vec<GroupId> = store.groups_for_scene(scene).iter().map(|g| g.id).collect();
        assert_eq!(ids, vec![c, a, b]);

        let orders: Vec<i32> = store
            .groups_for_scene(scene)
            .iter()
            .map(|g| g.order)
            .collect();
        assert_eq!(orders, vec![1, 2, 3]);
    }

    #[test]
    fn test_sort_action_rejects_foreign_parent() {
        let (store, _) = sample();
        let action = store.doc.read().actions[0].clone();
        assert!(store.sort_action(action.group_id + 100, action.id, 1).is_err());
    }

    #[test]
    fn test_deletes_cascade() {
        let (store, show_id) = sample();
        let scene_id = store.cycles_for_show(show_id)[0].scene_id;

        store.delete_scene(scene_id).unwrap();
        assert!(store.groups_for_scene(scene_id).is_empty());
        assert!(store.document().actions.is_empty());

        store.delete_show(show_id).unwrap();
        assert!(store.cycles_for_show(show_id).is_empty());
    }

    #[test]
    fn test_delete_device_drops_references() {
        let (store, show_id) = sample();
        let porch = store.devices()[0].id;
        store.delete_device(porch).unwrap();

        let show = store.get_show_recursive(show_id).unwrap();
        assert_eq!(show.dispatch_count(), 0);
    }

    #[test]
    fn test_add_cycle_requires_scene() {
        let store = MemoryStore::new();
        let show = store.add_show(ShowRecord {
            name: "Empty".to_string(),
            ..Default::default()
        });
        assert!(matches!(
            store.add_cycle(cycle(show, 5)),
            Err(StoreError::NotFound { kind: "scene", .. })
        ));
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_save_reports_failed_flush() {
        let (store, _) = sample();
        let result = store.save(Path::new("/dev/full"));
        assert!(matches!(result, Err(StoreError::Io(_))));
    }

    #[test]
    fn test_save_and_load() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("shows.json");

        let (store, show_id) = sample();
        store.save(&path).unwrap();

        let loaded = MemoryStore::load(&path).unwrap();
        assert_eq!(loaded.document(), store.document());
        assert_eq!(
            loaded.get_show_recursive(show_id).unwrap(),
            store.get_show_recursive(show_id).unwrap()
        );
    }
}
