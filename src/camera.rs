use glam::{Mat4, Vec3};

const DEFAULT_YAW: f32 = -90.0;
const DEFAULT_PITCH: f32 = 0.0;
const DEFAULT_SPEED: f32 = 2.5;
const DEFAULT_SENSITIVITY: f32 = 0.1;
const DEFAULT_ZOOM: f32 = 45.0;
const SPRINT_MULTIPLIER: f32 = 2.0;

/// Pitch is kept strictly inside the open interval so the basis never
/// degenerates at the poles.
const PITCH_LIMIT: f32 = 89.0;
const ZOOM_MIN: f32 = 1.0;
const ZOOM_MAX: f32 = 45.0;

/// Discrete movement commands dispatched from held keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveDirection {
    Forward,
    Backward,
    Left,
    Right,
    Up,
    Down,
    SpeedUp,
    SpeedDown,
}

/// Mouse-look mode. Entering arms a one-sample discard so the delta produced
/// by warping the cursor into the window does not kick the view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FreeLook {
    Disabled,
    Enabled { discard_next_delta: bool },
}

/// First-person free-look camera driven by yaw/pitch euler angles.
///
/// The front/right/up basis is recomputed from the angles after every update
/// rather than rotated incrementally, so it stays orthonormal and
/// right-handed no matter how many events have been applied.
#[derive(Debug, Clone)]
pub struct Camera {
    pub position: Vec3,
    front: Vec3,
    up: Vec3,
    right: Vec3,
    world_up: Vec3,
    yaw: f32,
    pitch: f32,
    speed: f32,
    sprinting: bool,
    sensitivity: f32,
    zoom: f32,
    mode: FreeLook,
}

impl Default for Camera {
    fn default() -> Self {
        Self::new(Vec3::new(0.0, 0.0, 3.0))
    }
}

impl Camera {
    /// Creates a camera at `position` looking down the negative Z axis.
    pub fn new(position: Vec3) -> Self {
        let mut camera = Self {
            position,
            front: Vec3::NEG_Z,
            up: Vec3::Y,
            right: Vec3::X,
            world_up: Vec3::Y,
            yaw: DEFAULT_YAW,
            pitch: DEFAULT_PITCH,
            speed: DEFAULT_SPEED,
            sprinting: false,
            sensitivity: DEFAULT_SENSITIVITY,
            zoom: DEFAULT_ZOOM,
            mode: FreeLook::Disabled,
        };
        camera.update_basis();
        camera
    }

    pub fn front(&self) -> Vec3 {
        self.front
    }

    pub fn right(&self) -> Vec3 {
        self.right
    }

    pub fn up(&self) -> Vec3 {
        self.up
    }

    pub fn pitch(&self) -> f32 {
        self.pitch
    }

    pub fn yaw(&self) -> f32 {
        self.yaw
    }

    /// Vertical field of view in degrees, driven by the scroll wheel.
    pub fn zoom(&self) -> f32 {
        self.zoom
    }

    pub fn speed(&self) -> f32 {
        self.speed
    }

    pub fn free_look_enabled(&self) -> bool {
        matches!(self.mode, FreeLook::Enabled { .. })
    }

    /// Enters free-look. The next mouse delta is treated as a re-centering
    /// event and discarded.
    pub fn enter_free_look(&mut self) {
        self.mode = FreeLook::Enabled {
            discard_next_delta: true,
        };
    }

    /// Leaves free-look; mouse movement is ignored until the next entry.
    pub fn exit_free_look(&mut self) {
        self.mode = FreeLook::Disabled;
    }

    /// Translates the camera along its current basis. Position is
    /// unconstrained in world space.
    pub fn process_keyboard(&mut self, direction: MoveDirection, dt: f32) {
        let velocity = self.effective_speed() * dt;
        match direction {
            MoveDirection::Forward => self.position += self.front * velocity,
            MoveDirection::Backward => self.position -= self.front * velocity,
            MoveDirection::Left => self.position -= self.right * velocity,
            MoveDirection::Right => self.position += self.right * velocity,
            MoveDirection::Up => self.position += self.up * velocity,
            MoveDirection::Down => self.position -= self.up * velocity,
            MoveDirection::SpeedUp => self.sprinting = true,
            MoveDirection::SpeedDown => self.sprinting = false,
        }
    }

    /// Applies a mouse delta to yaw/pitch. Only effective in free-look mode;
    /// the first sample after entering free-look is swallowed.
    pub fn process_mouse_movement(&mut self, dx: f32, dy: f32) {
        match self.mode {
            FreeLook::Disabled => {}
            FreeLook::Enabled {
                discard_next_delta: true,
            } => {
                self.mode = FreeLook::Enabled {
                    discard_next_delta: false,
                };
            }
            FreeLook::Enabled {
                discard_next_delta: false,
            } => {
                self.yaw += dx * self.sensitivity;
                self.pitch += dy * self.sensitivity;
                self.pitch = self.pitch.clamp(-PITCH_LIMIT, PITCH_LIMIT);
                self.update_basis();
            }
        }
    }

    /// Adjusts the zoom (vertical FOV) from scroll input, clamped to
    /// `[ZOOM_MIN, ZOOM_MAX]` degrees.
    pub fn process_scroll(&mut self, dy: f32) {
        self.zoom = (self.zoom - dy).clamp(ZOOM_MIN, ZOOM_MAX);
    }

    /// Right-handed look-at transform from the current pose. Pure.
    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.position, self.position + self.front, self.up)
    }

    /// Perspective projection from the current zoom.
    pub fn projection_matrix(&self, aspect: f32) -> Mat4 {
        Mat4::perspective_rh(self.zoom.to_radians(), aspect.max(0.01), 0.1, 100.0)
    }

    fn effective_speed(&self) -> f32 {
        if self.sprinting {
            self.speed * SPRINT_MULTIPLIER
        } else {
            self.speed
        }
    }

    fn update_basis(&mut self) {
        let (yaw_sin, yaw_cos) = self.yaw.to_radians().sin_cos();
        let (pitch_sin, pitch_cos) = self.pitch.to_radians().sin_cos();
        self.front = Vec3::new(yaw_cos * pitch_cos, pitch_sin, yaw_sin * pitch_cos).normalize();
        self.right = self.front.cross(self.world_up).normalize();
        self.up = self.right.cross(self.front).normalize();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(a: Vec3, b: Vec3) {
        assert!((a - b).length() < 1e-4, "{a:?} != {b:?}");
    }

    fn looking_camera() -> Camera {
        let mut camera = Camera::default();
        camera.enter_free_look();
        // Swallow the re-centering sample so movement applies.
        camera.process_mouse_movement(0.0, 0.0);
        camera
    }

    #[test]
    fn pitch_stays_clamped_under_any_sequence() {
        let mut camera = looking_camera();
        for _ in 0..100 {
            camera.process_mouse_movement(3.0, 500.0);
        }
        assert!(camera.pitch() < 89.0 + 1e-6);
        for _ in 0..500 {
            camera.process_mouse_movement(-7.0, -123.4);
        }
        assert!(camera.pitch() > -(89.0 + 1e-6));
        assert!(camera.pitch().abs() <= 89.0);
    }

    #[test]
    fn basis_stays_orthonormal_after_updates() {
        let mut camera = looking_camera();
        for i in 0..50 {
            camera.process_mouse_movement(i as f32 * 13.7, -(i as f32) * 5.1);
        }
        assert!((camera.front().length() - 1.0).abs() < 1e-5);
        assert!((camera.right().length() - 1.0).abs() < 1e-5);
        assert!((camera.up().length() - 1.0).abs() < 1e-5);
        assert!(camera.front().dot(camera.right()).abs() < 1e-5);
        assert!(camera.front().dot(camera.up()).abs() < 1e-5);
        // Right-handed frame: front x right = -up, equivalently
        // right x front = up.
        assert_close(camera.right().cross(camera.front()), camera.up());
    }

    #[test]
    fn view_matrix_round_trips_through_inverse_pose() {
        let mut camera = looking_camera();
        camera.position = Vec3::new(1.5, -2.0, 7.25);
        camera.process_mouse_movement(123.0, -45.0);

        let view = camera.view_matrix();
        let pose = view.inverse();
        let identity = view * pose;
        for (col, expected) in identity
            .to_cols_array_2d()
            .iter()
            .zip(Mat4::IDENTITY.to_cols_array_2d().iter())
        {
            for (a, b) in col.iter().zip(expected.iter()) {
                assert!((a - b).abs() < 1e-4);
            }
        }
        // The inverse pose carries the eye back to the camera position.
        assert_close(pose.transform_point3(Vec3::ZERO), camera.position);
        // A point one unit down the view axis sits in front of the camera.
        assert_close(
            view.transform_point3(camera.position + camera.front()),
            Vec3::NEG_Z,
        );
    }

    #[test]
    fn entering_free_look_discards_exactly_one_sample() {
        let mut camera = Camera::default();
        let initial_yaw = camera.yaw();

        camera.enter_free_look();
        camera.process_mouse_movement(500.0, 0.0);
        assert_eq!(camera.yaw(), initial_yaw);
        camera.process_mouse_movement(10.0, 0.0);
        assert!((camera.yaw() - (initial_yaw + 1.0)).abs() < 1e-5);

        // Re-entry arms the discard again, once.
        camera.exit_free_look();
        camera.enter_free_look();
        let yaw = camera.yaw();
        camera.process_mouse_movement(500.0, 0.0);
        assert_eq!(camera.yaw(), yaw);
        camera.process_mouse_movement(10.0, 0.0);
        assert!((camera.yaw() - (yaw + 1.0)).abs() < 1e-5);
    }

    #[test]
    fn mouse_movement_is_ignored_outside_free_look() {
        let mut camera = Camera::default();
        let front = camera.front();
        camera.process_mouse_movement(300.0, 300.0);
        assert_close(camera.front(), front);
    }

    #[test]
    fn zoom_never_leaves_clamped_range() {
        let mut camera = Camera::default();
        for _ in 0..1000 {
            camera.process_scroll(3.0);
            assert!(camera.zoom() >= 1.0 && camera.zoom() <= 45.0);
        }
        assert_eq!(camera.zoom(), 1.0);
        for _ in 0..1000 {
            camera.process_scroll(-3.0);
            assert!(camera.zoom() >= 1.0 && camera.zoom() <= 45.0);
        }
        assert_eq!(camera.zoom(), 45.0);
    }

    #[test]
    fn one_second_forward_moves_speed_times_front() {
        let mut camera = Camera::default();
        let front = camera.front();
        let start = camera.position;
        camera.process_keyboard(MoveDirection::Forward, 1.0);
        assert_close(camera.position, start + front * 2.5);
    }

    #[test]
    fn strafe_sequence_matches_hand_computed_vector() {
        let mut camera = Camera::default();
        let start = camera.position;
        // Half a second forward, half a second left, at default speed.
        camera.process_keyboard(MoveDirection::Forward, 0.5);
        camera.process_keyboard(MoveDirection::Left, 0.5);
        let expected = start + camera.front() * 1.25 - camera.right() * 1.25;
        assert_close(camera.position, expected);
    }

    #[test]
    fn sprint_doubles_displacement_until_released() {
        let mut camera = Camera::default();
        let start = camera.position;
        camera.process_keyboard(MoveDirection::SpeedUp, 0.0);
        camera.process_keyboard(MoveDirection::Forward, 1.0);
        assert_close(camera.position, start + camera.front() * 5.0);
        camera.process_keyboard(MoveDirection::SpeedDown, 0.0);
        let mid = camera.position;
        camera.process_keyboard(MoveDirection::Forward, 1.0);
        assert_close(camera.position, mid + camera.front() * 2.5);
    }
}
