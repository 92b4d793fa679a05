// FRAME_HEAD marks the beginning of every frame (command or response).
pub const FRAME_HEAD: [u8; 2] = [0x53, 0x59];

// FRAME_TAIL marks the end of every frame (command or response).
pub const FRAME_TAIL: [u8; 2] = [0x54, 0x43];

// QUERY_FILLER is the documented "don't care" byte sent in the payload of a
// register query (as opposed to a register set).
pub const QUERY_FILLER: u8 = 0x0F;

// Register (control byte) addresses.
pub const REG_CONFIG: u8 = 0x01;
pub const REG_WORK_MODE: u8 = 0x02;
pub const REG_BASIC_HUMAN: u8 = 0x80;
pub const REG_BREATH: u8 = 0x81;
pub const REG_SLEEP: u8 = 0x84;
pub const REG_HEART: u8 = 0x85;

// Configuration register commands.
pub const CMD_RESET: u8 = 0x02;
pub const CMD_SET_LED: u8 = 0x03;
pub const CMD_GET_LED: u8 = 0x83;

// Work mode register commands and modes. The sensor uses the same command
// byte for get and set; the payload distinguishes them.
pub const CMD_WORK_MODE: u8 = 0xA8;
pub const MODE_SLEEP: u8 = 0x02;

// Basic human detection commands.
pub const CMD_GET_PRESENCE: u8 = 0x81;
pub const CMD_GET_MOVEMENT: u8 = 0x82;

// Vital sign commands (on REG_BREATH and REG_HEART respectively).
pub const CMD_GET_BREATHING: u8 = 0x82;
pub const CMD_GET_HEART_RATE: u8 = 0x82;

// Sleep register commands.
pub const CMD_GET_IN_BED: u8 = 0x81;
pub const CMD_GET_SLEEP_STATE: u8 = 0x82;
pub const CMD_GET_WAKE_DURATION: u8 = 0x83;
pub const CMD_GET_LIGHT_SLEEP: u8 = 0x84;
pub const CMD_GET_DEEP_SLEEP: u8 = 0x85;
pub const CMD_GET_SLEEP_QUALITY: u8 = 0x86;
pub const CMD_GET_SLEEP_COMPOSITE: u8 = 0x8D;
pub const CMD_GET_SLEEP_DISTURBANCE: u8 = 0x8E;
pub const CMD_GET_SLEEP_QUALITY_RATING: u8 = 0x90;
pub const CMD_GET_ABNORMAL_STRUGGLE: u8 = 0x91;

// The sensor needs a settling pause after acknowledging a soft reset
// before it accepts further commands.
pub const RESET_SETTLE_MS: u32 = 100;

// The protocol never carries large payloads; the sleep composite (8 data
// bytes) is the longest response in use.
pub const MAX_PAYLOAD_LEN: usize = 16;

// Head (2) + control + command + length (2) + payload + checksum + tail (2).
pub const MAX_FRAME_LEN: usize = MAX_PAYLOAD_LEN + 9;

// Upper bound on bytes kept for timeout diagnostics.
pub const CAPTURE_LEN: usize = 64;
