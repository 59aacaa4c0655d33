//! Pad session: wires the local cache, the cloud reconciler, and the two
//! users' drawing state into the flows the UI drives.
//!
//! All mutable state lives in this one struct, constructed once per process
//! and handed to the frontend by reference — there are no ambient globals.

use std::collections::HashMap;
use std::time::Instant;

use uuid::Uuid;

use crate::archive::{self, ArchiveItem};
use crate::config::PadConfig;
use crate::error::Result;
use crate::history::HistoryManager;
use crate::io;
use crate::keys::{self, DEVICE_ID_KEY, PageScope};
use crate::ops::{fill, paint};
use crate::palette;
use crate::remote::RemoteStore;
use crate::store::LocalStore;
use crate::surface::{BACKING_RATIO, Surface};
use crate::sync::CloudSync;
use crate::text::NoteChannel;
use crate::transform::{
    PinchState, SurfaceView, TouchPoint, WHEEL_ROTATE_STEP_DEG, WHEEL_ZOOM_IN, WHEEL_ZOOM_OUT,
};
use crate::{log_info, log_warn};

/// Read-state of a user's surface as seen by the peer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Status {
    /// Unseen by the peer since the last save.
    Red,
    /// Opened by the peer after the last save.
    Green,
}

impl Status {
    pub fn as_str(self) -> &'static str {
        match self {
            Status::Red => "red",
            Status::Green => "green",
        }
    }

    /// Missing or unknown values read as red.
    pub fn parse(value: Option<&str>) -> Self {
        match value {
            Some("green") => Status::Green,
            _ => Status::Red,
        }
    }
}

/// Brush / eraser / fill settings shared by both surfaces.
#[derive(Clone, Debug)]
pub struct ToolSettings {
    pub brush_size: u32,
    pub brush_opacity: f32,
    pub brush_color: String,
    pub eraser_size: u32,
    pub eraser_opacity: f32,
    pub is_eraser: bool,
    pub fill_mode: bool,
}

impl Default for ToolSettings {
    fn default() -> Self {
        Self {
            brush_size: 5,
            brush_opacity: 1.0,
            brush_color: "#000000".to_string(),
            eraser_size: 20,
            eraser_opacity: 1.0,
            is_eraser: false,
            fill_mode: false,
        }
    }
}

/// The single active gesture: one-finger drawing and two-finger
/// zoom/rotate/pan are mutually exclusive within an interaction.
#[derive(Clone, Copy, Debug)]
enum Gesture {
    Idle,
    Drawing { last_x: f32, last_y: f32 },
    Pinch(PinchState),
}

struct UserState {
    surface: Surface,
    view: SurfaceView,
    /// Local edits not yet saved to the cloud.
    dirty: bool,
    /// Last payload applied to the surface; unchanged payloads are skipped
    /// on reload so the poll cycle never causes a redundant redraw.
    last_applied: Option<String>,
    /// Bumped on every visible surface change; render-cache invalidation
    /// handle for the frontend.
    generation: u64,
}

impl UserState {
    fn new(css_width: f64, css_height: f64, viewport_width: f64, viewport_height: f64) -> Self {
        let raster_w = (css_width as u32) * BACKING_RATIO;
        let raster_h = (css_height as u32) * BACKING_RATIO;
        Self {
            surface: Surface::new(raster_w, raster_h),
            view: SurfaceView::new(css_width, css_height, viewport_width, viewport_height),
            dirty: false,
            last_applied: None,
            generation: 0,
        }
    }
}

pub struct PadSession {
    store: LocalStore,
    sync: CloudSync,
    config: PadConfig,
    scope: PageScope,
    device_id: String,
    users: [String; 2],
    states: HashMap<String, UserState>,
    notes: HashMap<String, NoteChannel>,
    history: HistoryManager,
    pub tools: ToolSettings,
    active_user: Option<String>,
    gesture: Gesture,
}

impl PadSession {
    pub fn new(
        mut store: LocalStore,
        remote: Box<dyn RemoteStore>,
        config: PadConfig,
        scope: PageScope,
        users: [String; 2],
        css_size: (f64, f64),
        viewport_size: (f64, f64),
    ) -> Self {
        let device_id = match store.read(DEVICE_ID_KEY) {
            Some(id) => id,
            None => {
                let id = Uuid::new_v4().to_string();
                store.write(DEVICE_ID_KEY, &id);
                id
            }
        };

        let sync = CloudSync::new(remote, config.pending_fresh_window());
        let history = HistoryManager::new(config.history_cap);

        let mut states = HashMap::new();
        let mut notes = HashMap::new();
        for user in &users {
            states.insert(
                user.clone(),
                UserState::new(css_size.0, css_size.1, viewport_size.0, viewport_size.1),
            );
            notes.insert(user.clone(), NoteChannel::new(user, config.text_save_delay()));
        }

        Self {
            store,
            sync,
            config,
            scope,
            device_id,
            users,
            states,
            notes,
            history,
            tools: ToolSettings::default(),
            active_user: None,
            gesture: Gesture::Idle,
        }
    }

    /// Initial sync: one pull before the first poll tick, then load both
    /// surfaces and mark the device owner's surface as seen.
    pub fn start(&mut self) {
        self.sync.pull(&mut self.store);
        for user in self.users.clone() {
            if let Err(e) = self.load_from_store(&user, true) {
                log_warn!("initial load for {} failed: {}", user, e);
            }
        }
        self.mark_seen_on_open();
    }

    fn mark_seen_on_open(&mut self) {
        let owner = self.users[0].clone();
        let key = keys::status_key(&owner, self.scope);
        self.sync.push(&mut self.store, &key, Status::Green.as_str());
    }

    pub fn device_id(&self) -> &str {
        &self.device_id
    }

    pub fn users(&self) -> &[String; 2] {
        &self.users
    }

    pub fn active_user(&self) -> Option<&str> {
        self.active_user.as_deref()
    }

    pub fn store(&self) -> &LocalStore {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut LocalStore {
        &mut self.store
    }

    pub fn sync(&self) -> &CloudSync {
        &self.sync
    }

    pub fn sync_mut(&mut self) -> &mut CloudSync {
        &mut self.sync
    }

    pub fn surface(&self, user: &str) -> Option<&Surface> {
        self.states.get(user).map(|s| &s.surface)
    }

    pub fn view(&self, user: &str) -> Option<&SurfaceView> {
        self.states.get(user).map(|s| &s.view)
    }

    pub fn generation(&self, user: &str) -> u64 {
        self.states.get(user).map_or(0, |s| s.generation)
    }

    pub fn is_dirty(&self, user: &str) -> bool {
        self.states.get(user).is_some_and(|s| s.dirty)
    }

    pub fn status_of(&self, user: &str) -> Status {
        Status::parse(self.store.read(&keys::status_key(user, self.scope)).as_deref())
    }

    // ---- surface lifecycle ------------------------------------------------

    /// Enter a surface for editing. Flips the status to green only when the
    /// last editor was a *different* device, so reopening one's own fresh
    /// edit never clears it.
    pub fn open_surface(&mut self, user: &str) {
        if !self.states.contains_key(user) {
            return;
        }
        self.active_user = Some(user.to_string());
        self.gesture = Gesture::Idle;

        let last_editor = self.store.read(&keys::last_editor_key(user, self.scope));
        if let Some(editor) = last_editor
            && editor != self.device_id
        {
            let key = keys::status_key(user, self.scope);
            self.sync.push(&mut self.store, &key, Status::Green.as_str());
        }
    }

    /// Leave the active surface, discarding whatever was not saved to the
    /// cloud and resetting every view transform.
    pub fn close_surface(&mut self) {
        if let Some(user) = self.active_user.take() {
            self.discard_unsaved(&user);
        }
        self.gesture = Gesture::Idle;
        for state in self.states.values_mut() {
            state.view.reset();
        }
    }

    /// Re-create a user's raster for a new layout size. Content is reloaded
    /// from the store; pan/zoom resets.
    pub fn resize(
        &mut self,
        user: &str,
        css_size: (f64, f64),
        viewport_size: (f64, f64),
    ) -> Result<()> {
        let Some(state) = self.states.get_mut(user) else {
            return Ok(());
        };
        let raster_w = (css_size.0 as u32) * BACKING_RATIO;
        let raster_h = (css_size.1 as u32) * BACKING_RATIO;
        let changed = raster_w != state.surface.width() || raster_h != state.surface.height();
        if changed {
            let dirty = state.dirty;
            *state = UserState::new(css_size.0, css_size.1, viewport_size.0, viewport_size.1);
            state.dirty = dirty;
        } else {
            state.view.viewport_width = viewport_size.0;
            state.view.viewport_height = viewport_size.1;
        }
        self.load_from_store(user, changed)?;
        Ok(())
    }

    // ---- persistence flows ------------------------------------------------

    /// Write the current raster to the local cache and shield it (and the
    /// red status) from pulls until saved or discarded.
    fn persist_drawing_locally(&mut self, user: &str) -> Result<()> {
        let Some(state) = self.states.get_mut(user) else {
            return Ok(());
        };
        let payload = io::encode_surface(&state.surface)?;
        state.last_applied = Some(payload.clone());
        state.dirty = true;
        state.generation += 1;

        let drawing_key = keys::drawing_key(user, self.scope);
        let status_key = keys::status_key(user, self.scope);
        self.store.write(&drawing_key, &payload);
        self.store.write(&status_key, Status::Red.as_str());
        self.store.write(&keys::last_editor_key(user, self.scope), &self.device_id);
        self.sync.hold_local_value(&drawing_key, &payload);
        self.sync.hold_local_value(&status_key, Status::Red.as_str());
        Ok(())
    }

    /// Explicit save: push drawing + status to the remote store and remember
    /// the payload as the new saved snapshot.
    pub fn save_to_cloud(&mut self, user: &str) -> Result<()> {
        self.persist_drawing_locally(user)?;

        let drawing_key = keys::drawing_key(user, self.scope);
        let status_key = keys::status_key(user, self.scope);
        let payload = self.store.read(&drawing_key).unwrap_or_default();
        self.sync.push(&mut self.store, &drawing_key, &payload);
        self.sync.push(&mut self.store, &status_key, Status::Red.as_str());
        self.store.write(&keys::saved_snapshot_key(user, self.scope), &payload);

        if let Some(state) = self.states.get_mut(user) {
            state.dirty = false;
        }
        log_info!("saved drawing for {} ({} bytes)", user, payload.len());
        Ok(())
    }

    /// Drop unsaved edits: restore the last cloud-saved snapshot and release
    /// the pull shields.
    pub fn discard_unsaved(&mut self, user: &str) {
        if !self.is_dirty(user) {
            return;
        }
        let Some(snapshot) = self.store.read(&keys::saved_snapshot_key(user, self.scope)) else {
            return;
        };

        let drawing_key = keys::drawing_key(user, self.scope);
        self.store.write(&drawing_key, &snapshot);
        self.sync.clear_pending(&drawing_key);
        self.sync.clear_pending(&keys::status_key(user, self.scope));

        if let Some(state) = self.states.get_mut(user) {
            state.last_applied = None;
            state.dirty = false;
        }
        if let Err(e) = self.load_from_store(user, true) {
            log_warn!("discard reload for {} failed: {}", user, e);
        }
    }

    /// Apply the stored drawing payload to the raster. Skips decode when the
    /// payload is unchanged (unless `force`), so repeated polls are free. A
    /// decode failure aborts the load and preserves the previous raster.
    pub fn load_from_store(&mut self, user: &str, force: bool) -> Result<bool> {
        let payload = self.store.read(&keys::drawing_key(user, self.scope));

        let Some(state) = self.states.get(user) else {
            return Ok(false);
        };
        if !force && payload == state.last_applied {
            return Ok(false);
        }
        if !state.dirty {
            // Clean surface: what the store holds is, by definition, saved
            self.store.write(
                &keys::saved_snapshot_key(user, self.scope),
                payload.as_deref().unwrap_or(""),
            );
        }

        let decoded = match payload.as_deref() {
            None | Some("") => None,
            Some(p) => {
                let state = &self.states[user];
                let (w, h) = (state.surface.width(), state.surface.height());
                Some(io::decode_payload_scaled(p, w, h)?)
            }
        };

        let Some(state) = self.states.get_mut(user) else {
            return Ok(false);
        };
        state.last_applied = payload;
        state.generation += 1;
        match decoded {
            Some(surface) => state.surface = surface,
            None => state.surface.clear(),
        }
        Ok(true)
    }

    // ---- drawing gestures -------------------------------------------------

    fn active_drawing_user(&self) -> Option<String> {
        self.active_user.clone()
    }

    /// One-finger press on the active surface: flood fill in fill mode,
    /// otherwise the start of a stroke. Ignored while a pinch is running.
    pub fn begin_stroke(&mut self, view_x: f64, view_y: f64) -> Result<()> {
        let Some(user) = self.active_drawing_user() else {
            return Ok(());
        };
        if matches!(self.gesture, Gesture::Pinch(_)) {
            return Ok(());
        }

        let tools = self.tools.clone();
        let Some(state) = self.states.get_mut(&user) else {
            return Ok(());
        };
        let (w, h) = (state.surface.width(), state.surface.height());
        let (x, y) = state.view.map_pointer_to_raster(view_x, view_y, w, h);

        if tools.fill_mode {
            self.history.record_snapshot(&user, &state.surface);
            let color = palette::parse_hex(&tools.brush_color).unwrap_or([0, 0, 0]);
            let opacity =
                if tools.is_eraser { tools.eraser_opacity } else { tools.brush_opacity };
            fill::flood_fill(
                &mut state.surface,
                x as u32,
                y as u32,
                color,
                opacity,
                tools.is_eraser,
            );
            state.generation += 1;
            return self.persist_drawing_locally(&user);
        }

        self.history.record_snapshot(&user, &state.surface);
        self.gesture = Gesture::Drawing { last_x: x as f32, last_y: y as f32 };
        Ok(())
    }

    pub fn continue_stroke(&mut self, view_x: f64, view_y: f64) {
        let Gesture::Drawing { last_x, last_y } = self.gesture else {
            return;
        };
        let Some(user) = self.active_drawing_user() else {
            return;
        };
        let tools = self.tools.clone();
        let Some(state) = self.states.get_mut(&user) else {
            return;
        };
        let (w, h) = (state.surface.width(), state.surface.height());
        let (x, y) = state.view.map_pointer_to_raster(view_x, view_y, w, h);

        let (size, opacity) = if tools.is_eraser {
            (tools.eraser_size, tools.eraser_opacity)
        } else {
            (tools.brush_size, tools.brush_opacity)
        };
        let color = palette::parse_hex(&tools.brush_color).unwrap_or([0, 0, 0]);
        paint::stroke_segment(
            &mut state.surface,
            last_x,
            last_y,
            x as f32,
            y as f32,
            size,
            color,
            opacity,
            tools.is_eraser,
        );
        state.generation += 1;
        self.gesture = Gesture::Drawing { last_x: x as f32, last_y: y as f32 };
    }

    pub fn end_stroke(&mut self) -> Result<()> {
        if !matches!(self.gesture, Gesture::Drawing { .. }) {
            return Ok(());
        }
        self.gesture = Gesture::Idle;
        let Some(user) = self.active_drawing_user() else {
            return Ok(());
        };
        self.persist_drawing_locally(&user)
    }

    /// Second finger down: whatever stroke was in progress is over, the
    /// interaction is a zoom/rotate/pan from here on.
    pub fn begin_pinch(&mut self, a: TouchPoint, b: TouchPoint) {
        if self.active_user.is_none() {
            return;
        }
        self.gesture = Gesture::Pinch(PinchState::begin(a, b));
    }

    pub fn move_pinch(&mut self, a: TouchPoint, b: TouchPoint) {
        let Gesture::Pinch(mut pinch) = self.gesture else {
            return;
        };
        let Some(user) = self.active_drawing_user() else {
            return;
        };
        if let Some(state) = self.states.get_mut(&user) {
            state.view.apply_pinch_frame(&mut pinch, a, b);
        }
        self.gesture = Gesture::Pinch(pinch);
    }

    /// A finger lifted: the gesture ends, and drawing stays off until the
    /// next press.
    pub fn end_pinch(&mut self) {
        self.gesture = Gesture::Idle;
    }

    pub fn wheel_zoom(&mut self, zoom_in: bool, view_x: f64, view_y: f64) {
        let Some(user) = self.active_drawing_user() else {
            return;
        };
        let factor = if zoom_in { WHEEL_ZOOM_IN } else { WHEEL_ZOOM_OUT };
        if let Some(state) = self.states.get_mut(&user) {
            state.view.zoom_around_point(factor, view_x, view_y);
        }
    }

    pub fn wheel_rotate(&mut self, clockwise: bool) {
        let Some(user) = self.active_drawing_user() else {
            return;
        };
        let step = if clockwise { WHEEL_ROTATE_STEP_DEG } else { -WHEEL_ROTATE_STEP_DEG };
        if let Some(state) = self.states.get_mut(&user) {
            state.view.rotate_around_viewport_center(step);
        }
    }

    /// Two-finger pan with the pointer (right-drag on desktop).
    pub fn drag_pan(&mut self, dx: f64, dy: f64) {
        let Some(user) = self.active_drawing_user() else {
            return;
        };
        if let Some(state) = self.states.get_mut(&user) {
            let t = state.view.transform();
            state.view.set_transform(t.tx + dx, t.ty + dy, t.scale, t.rotation_deg);
        }
    }

    // ---- history ----------------------------------------------------------

    pub fn undo(&mut self) -> Result<bool> {
        let Some(user) = self.active_drawing_user() else {
            return Ok(false);
        };
        let Some(state) = self.states.get_mut(&user) else {
            return Ok(false);
        };
        let Some(restored) = self.history.undo(&user, &state.surface) else {
            return Ok(false);
        };
        state.surface = restored;
        self.persist_drawing_locally(&user)?;
        Ok(true)
    }

    pub fn redo(&mut self) -> Result<bool> {
        let Some(user) = self.active_drawing_user() else {
            return Ok(false);
        };
        let Some(state) = self.states.get_mut(&user) else {
            return Ok(false);
        };
        let Some(restored) = self.history.redo(&user, &state.surface) else {
            return Ok(false);
        };
        state.surface = restored;
        self.persist_drawing_locally(&user)?;
        Ok(true)
    }

    pub fn clear_surface(&mut self) -> Result<()> {
        let Some(user) = self.active_drawing_user() else {
            return Ok(());
        };
        if let Some(state) = self.states.get_mut(&user) {
            self.history.record_snapshot(&user, &state.surface);
            state.surface.clear();
            state.generation += 1;
        }
        self.persist_drawing_locally(&user)
    }

    // ---- text notes -------------------------------------------------------

    pub fn note_input(&mut self, user: &str, text: &str, now: Instant) {
        if let Some(channel) = self.notes.get_mut(user) {
            channel.input(&mut self.store, text, now);
        }
    }

    pub fn note_flush(&mut self, user: &str) {
        if let Some(channel) = self.notes.get_mut(user) {
            channel.flush(&mut self.store, &mut self.sync);
        }
    }

    pub fn note_text(&self, user: &str) -> String {
        self.store.read(&keys::text_key(user)).unwrap_or_default()
    }

    /// Whether the note editor may show a stored/remote value right now.
    pub fn note_accepts_remote(&self, user: &str) -> bool {
        self.notes.get(user).is_none_or(|c| c.accepts_remote())
    }

    // ---- polling ----------------------------------------------------------

    /// One scheduler tick: pick up external store changes, pull the remote
    /// snapshot, fire due text saves, and refresh idle surfaces.
    pub fn tick(&mut self, now: Instant) {
        self.store.reload();
        self.sync.pull(&mut self.store);

        for channel in self.notes.values_mut() {
            channel.poll(&mut self.store, &mut self.sync, now);
        }

        // Never repaint under an active stroke or pinch
        if matches!(self.gesture, Gesture::Idle) {
            for user in self.users.clone() {
                if let Err(e) = self.load_from_store(&user, false) {
                    log_warn!("poll reload for {} failed: {}", user, e);
                }
            }
        }
    }

    /// Explicit refresh (button, tab-visible, window focus): force-reload
    /// both surfaces from the cache.
    pub fn refresh(&mut self) {
        for user in self.users.clone() {
            if let Err(e) = self.load_from_store(&user, true) {
                log_warn!("refresh reload for {} failed: {}", user, e);
            }
        }
    }

    /// Tab hidden / page hide: flush pending text saves before teardown.
    pub fn flush_all(&mut self) {
        for user in self.users.clone() {
            self.note_flush(&user);
        }
    }

    /// Tab became visible / window focused: pull on demand, then
    /// force-reload both surfaces.
    pub fn on_foreground(&mut self) {
        self.sync.pull(&mut self.store);
        self.refresh();
    }

    /// Tab hidden: make pending edits durable before the process may be
    /// frozen or torn down.
    pub fn on_background(&mut self) {
        self.flush_all();
    }

    // ---- archive ----------------------------------------------------------

    /// Save the active drawing to the cloud and file it in the archive.
    pub fn archive_current(&mut self, name: &str) -> Result<Option<ArchiveItem>> {
        let Some(user) = self.active_drawing_user() else {
            return Ok(None);
        };
        self.save_to_cloud(&user)?;

        let Some(payload) = self.store.read(&keys::drawing_key(&user, self.scope)) else {
            return Ok(None);
        };
        let cap = self.config.archive_cap;
        let item = archive::add_item(&mut self.store, &user, self.scope, name, &payload, cap);
        Ok(Some(item))
    }

    pub fn archive_items(&self, user: &str) -> Vec<ArchiveItem> {
        archive::items(&self.store, user, self.scope)
    }

    pub fn delete_archive_item(&mut self, user: &str, id: &str) {
        archive::delete_item(&mut self.store, user, self.scope, id);
    }

    /// Load an archived drawing onto the active surface (undoable).
    pub fn load_archive_item(&mut self, id: &str) -> Result<bool> {
        let Some(user) = self.active_drawing_user() else {
            return Ok(false);
        };
        let Some(item) = archive::find_item(&self.store, &user, self.scope, id) else {
            return Ok(false);
        };
        let Some(state) = self.states.get_mut(&user) else {
            return Ok(false);
        };

        let (w, h) = (state.surface.width(), state.surface.height());
        let decoded = io::decode_payload_scaled(&item.data_url, w, h)?;
        self.history.record_snapshot(&user, &state.surface);
        state.surface = decoded;
        state.generation += 1;
        self.persist_drawing_locally(&user)?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::FakeRemote;

    fn session_with(remote: &FakeRemote, device_seed: Option<&str>) -> PadSession {
        let mut store = LocalStore::in_memory();
        if let Some(id) = device_seed {
            store.write(DEVICE_ID_KEY, id);
        }
        PadSession::new(
            store,
            Box::new(remote.clone()),
            PadConfig::default(),
            PageScope::Main,
            ["niklas".to_string(), "jovelyn".to_string()],
            (100.0, 100.0),
            (100.0, 100.0),
        )
    }

    fn draw_dot(session: &mut PadSession) {
        session.begin_stroke(50.0, 50.0).unwrap();
        session.continue_stroke(52.0, 50.0);
        session.end_stroke().unwrap();
    }

    #[test]
    fn test_stroke_marks_dirty_and_red() {
        let remote = FakeRemote::default();
        let mut session = session_with(&remote, None);
        session.open_surface("niklas");
        draw_dot(&mut session);

        assert!(session.is_dirty("niklas"));
        assert_eq!(session.status_of("niklas"), Status::Red);
        assert!(session.store().read("niklas_drawing").is_some());
        // Not pushed yet — only held locally
        assert!(remote.state_of("niklas_drawing").is_none());
    }

    #[test]
    fn test_save_round_trips_between_devices() {
        let remote = FakeRemote::default();

        let mut a = session_with(&remote, Some("device-a"));
        a.open_surface("niklas");
        draw_dot(&mut a);
        a.save_to_cloud("niklas").unwrap();
        assert!(!a.is_dirty("niklas"));
        assert!(remote.state_of("niklas_drawing").is_some());

        // Device B pulls and sees the drawing
        let mut b = session_with(&remote, Some("device-b"));
        b.tick(Instant::now());
        assert!(!b.surface("niklas").unwrap().is_blank());
        assert_eq!(b.status_of("niklas"), Status::Red);
    }

    #[test]
    fn test_unsaved_drawing_survives_pulls() {
        let remote = FakeRemote::default();
        let mut session = session_with(&remote, None);
        session.open_surface("niklas");

        // The server holds an empty drawing
        remote.set_state("niklas_drawing", "");

        draw_dot(&mut session);
        let before = session.surface("niklas").unwrap().as_raw().to_vec();
        session.end_pinch(); // make sure the gesture is idle so tick repaints
        session.tick(Instant::now());
        assert_eq!(session.surface("niklas").unwrap().as_raw(), &before[..]);
    }

    #[test]
    fn test_discard_restores_saved_snapshot() {
        let remote = FakeRemote::default();
        let mut session = session_with(&remote, None);
        session.open_surface("niklas");

        draw_dot(&mut session);
        session.save_to_cloud("niklas").unwrap();
        let saved = session.surface("niklas").unwrap().as_raw().to_vec();

        // More edits, then close without saving
        session.begin_stroke(20.0, 20.0).unwrap();
        session.continue_stroke(80.0, 80.0);
        session.end_stroke().unwrap();
        assert_ne!(session.surface("niklas").unwrap().as_raw(), &saved[..]);

        session.close_surface();
        assert_eq!(session.surface("niklas").unwrap().as_raw(), &saved[..]);
        assert!(!session.is_dirty("niklas"));
    }

    #[test]
    fn test_open_surface_status_only_flips_for_peer_edits() {
        let remote = FakeRemote::default();
        let mut session = session_with(&remote, Some("device-a"));

        // Own edit: reopening must not clear the red dot
        session.open_surface("niklas");
        draw_dot(&mut session);
        session.save_to_cloud("niklas").unwrap();
        session.close_surface();
        session.open_surface("niklas");
        assert_eq!(session.status_of("niklas"), Status::Red);
        session.close_surface();

        // Peer edit: last_editor differs, so opening marks it seen
        session.store_mut().write("niklas_last_editor", "device-b");
        session.open_surface("niklas");
        assert_eq!(session.status_of("niklas"), Status::Green);
        assert_eq!(remote.state_of("niklas_status").as_deref(), Some("green"));
    }

    #[test]
    fn test_undo_redo_through_session() {
        let remote = FakeRemote::default();
        let mut session = session_with(&remote, None);
        session.open_surface("niklas");

        let blank = session.surface("niklas").unwrap().as_raw().to_vec();
        draw_dot(&mut session);
        let drawn = session.surface("niklas").unwrap().as_raw().to_vec();
        assert_ne!(blank, drawn);

        assert!(session.undo().unwrap());
        assert_eq!(session.surface("niklas").unwrap().as_raw(), &blank[..]);
        assert!(session.redo().unwrap());
        assert_eq!(session.surface("niklas").unwrap().as_raw(), &drawn[..]);
    }

    #[test]
    fn test_pinch_blocks_drawing() {
        let remote = FakeRemote::default();
        let mut session = session_with(&remote, None);
        session.open_surface("niklas");

        let a = TouchPoint { x: 20.0, y: 50.0 };
        let b = TouchPoint { x: 80.0, y: 50.0 };
        session.begin_pinch(a, b);
        session.begin_stroke(50.0, 50.0).unwrap();
        session.continue_stroke(60.0, 60.0);
        session.end_stroke().unwrap();
        assert!(session.surface("niklas").unwrap().is_blank());

        // After lifting, drawing works again
        session.end_pinch();
        draw_dot(&mut session);
        assert!(!session.surface("niklas").unwrap().is_blank());
    }

    #[test]
    fn test_fill_mode_press_fills_and_persists() {
        let remote = FakeRemote::default();
        let mut session = session_with(&remote, None);
        session.open_surface("niklas");
        session.tools.fill_mode = true;
        session.tools.brush_color = "#ff0000".to_string();

        session.begin_stroke(50.0, 50.0).unwrap();
        let surface = session.surface("niklas").unwrap();
        assert_eq!(*surface.get_pixel(0, 0), image::Rgba([255, 0, 0, 255]));
        assert!(session.is_dirty("niklas"));
    }

    #[test]
    fn test_idempotent_tick_skips_redecode() {
        let remote = FakeRemote::default();
        let mut session = session_with(&remote, None);
        session.start();

        let mut a = session_with(&remote, Some("device-a"));
        a.open_surface("niklas");
        draw_dot(&mut a);
        a.save_to_cloud("niklas").unwrap();

        session.tick(Instant::now());
        let generation = session.generation("niklas");
        session.tick(Instant::now());
        session.tick(Instant::now());
        assert_eq!(session.generation("niklas"), generation, "unchanged payload must not redraw");
    }

    #[test]
    fn test_note_flow_through_session() {
        let remote = FakeRemote::default();
        let mut session = session_with(&remote, None);
        let t0 = Instant::now();

        session.note_input("niklas", "hallo du", t0);
        assert_eq!(session.note_text("niklas"), "hallo du");
        assert!(!session.note_accepts_remote("niklas"));
        assert!(remote.puts().is_empty());

        session.tick(t0 + PadConfig::default().text_save_delay() + std::time::Duration::from_millis(1));
        assert!(remote.puts().iter().any(|(k, v)| k == "niklas_text" && v == "hallo du"));
        assert!(session.note_accepts_remote("niklas"));
    }

    #[test]
    fn test_archive_current_and_load() {
        let remote = FakeRemote::default();
        let mut session = session_with(&remote, None);
        session.open_surface("niklas");
        draw_dot(&mut session);

        let item = session.archive_current("Mein Bild").unwrap().unwrap();
        assert_eq!(item.name, "Mein Bild");
        assert_eq!(session.archive_items("niklas").len(), 1);

        // Clear, then restore from the archive
        session.clear_surface().unwrap();
        assert!(session.surface("niklas").unwrap().is_blank());
        assert!(session.load_archive_item(&item.id).unwrap());
        assert!(!session.surface("niklas").unwrap().is_blank());
    }

    #[test]
    fn test_device_id_is_stable() {
        let remote = FakeRemote::default();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");

        let first = {
            let session = PadSession::new(
                LocalStore::open(path.clone()),
                Box::new(remote.clone()),
                PadConfig::default(),
                PageScope::Main,
                ["niklas".to_string(), "jovelyn".to_string()],
                (100.0, 100.0),
                (100.0, 100.0),
            );
            session.device_id().to_string()
        };

        let session = PadSession::new(
            LocalStore::open(path),
            Box::new(remote.clone()),
            PadConfig::default(),
            PageScope::Main,
            ["niklas".to_string(), "jovelyn".to_string()],
            (100.0, 100.0),
            (100.0, 100.0),
        );
        assert_eq!(session.device_id(), first);
    }
}
