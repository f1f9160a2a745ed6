use spin::Mutex;
use x86_64::instructions::interrupts;
use crate::constants::keyboard::{
    CMD_RESET_CPU, DATA_PORT, EVENT_QUEUE_CAPACITY, RELEASE_BIT, SCANCODE_BACKSPACE,
    SCANCODE_ENTER, STATUS_COMMAND_PORT, STATUS_OUTPUT_BUFFER_FULL,
};
use crate::error::InputError;
use crate::port::{HardwarePorts, PortIo};

/// A decoded key press.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyEvent {
    Char(char),
    Enter,
    Backspace,
}

/// Scan code set 1 make codes to ASCII; 0 marks an unmapped code.
pub struct ScancodeMap([u8; 128]);

impl ScancodeMap {
    const fn from_prefix(prefix: &[u8]) -> Self {
        let mut table = [0u8; 128];
        let mut i = 0;
        while i < prefix.len() {
            table[i] = prefix[i];
            i += 1;
        }
        ScancodeMap(table)
    }

    pub const fn lookup(&self, scancode: u8) -> Option<char> {
        if scancode as usize >= self.0.len() {
            return None;
        }
        match self.0[scancode as usize] {
            0 => None,
            ascii => Some(ascii as char),
        }
    }
}

/// US QWERTY, unshifted.
pub static US_QWERTY: ScancodeMap = ScancodeMap::from_prefix(&[
    0, 27, b'1', b'2', b'3', b'4', b'5', b'6', // 0x00
    b'7', b'8', b'9', b'0', b'-', b'=', 8, b'\t', // 0x08
    b'q', b'w', b'e', b'r', b't', b'y', b'u', b'i', // 0x10
    b'o', b'p', b'[', b']', b'\n', 0, b'a', b's', // 0x18 (0x1D ctrl)
    b'd', b'f', b'g', b'h', b'j', b'k', b'l', b';', // 0x20
    b'\'', b'`', 0, b'\\', b'z', b'x', b'c', b'v', // 0x28 (0x2A lshift)
    b'b', b'n', b'm', b',', b'.', b'/', 0, b'*', // 0x30 (0x36 rshift)
    0, b' ', // 0x38 (alt)
]);

/// Turn one raw scancode into a key event.
///
/// Releases (high bit set) and unmapped codes yield `None`.
pub fn decode(scancode: u8) -> Option<KeyEvent> {
    if scancode & RELEASE_BIT != 0 {
        return None;
    }
    match scancode {
        SCANCODE_ENTER => Some(KeyEvent::Enter),
        SCANCODE_BACKSPACE => Some(KeyEvent::Backspace),
        code => US_QWERTY.lookup(code).map(KeyEvent::Char),
    }
}

/// Anything the line editor can pull key events from.
pub trait KeySource {
    /// Next event if one is ready, without blocking.
    fn poll_event(&mut self) -> Option<KeyEvent>;

    /// Idle between empty polls.
    fn wait(&mut self) {
        core::hint::spin_loop();
    }

    /// Block until a key is pressed. Never times out.
    fn read_event(&mut self) -> KeyEvent {
        loop {
            if let Some(event) = self.poll_event() {
                return event;
            }
            self.wait();
        }
    }
}

/// Reads the controller directly; needs IRQ1 masked or interrupts off so
/// the interrupt handler does not consume the bytes first.
pub struct PolledKeyboard<P: PortIo = HardwarePorts> {
    ports: P,
}

impl PolledKeyboard {
    pub fn new() -> Self {
        PolledKeyboard::with_ports(unsafe { HardwarePorts::new() })
    }
}

impl<P: PortIo> PolledKeyboard<P> {
    pub fn with_ports(ports: P) -> Self {
        PolledKeyboard { ports }
    }

    /// Raw scancode if the controller's output buffer is full.
    pub fn try_read_scancode(&mut self) -> Option<u8> {
        let status = self.ports.read_u8(STATUS_COMMAND_PORT);
        if status & STATUS_OUTPUT_BUFFER_FULL != 0 {
            Some(self.ports.read_u8(DATA_PORT))
        } else {
            None
        }
    }
}

impl<P: PortIo> KeySource for PolledKeyboard<P> {
    fn poll_event(&mut self) -> Option<KeyEvent> {
        self.try_read_scancode().and_then(decode)
    }

    fn wait(&mut self) {
        self.ports.io_wait();
    }
}

/// Fixed-capacity FIFO of key events.
///
/// When full, `push` refuses the new event; queued events are never
/// overwritten.
pub struct KeyEventQueue<const N: usize> {
    slots: [Option<KeyEvent>; N],
    head: usize,
    len: usize,
}

impl<const N: usize> KeyEventQueue<N> {
    pub const fn new() -> Self {
        KeyEventQueue {
            slots: [None; N],
            head: 0,
            len: 0,
        }
    }

    pub fn push(&mut self, event: KeyEvent) -> Result<(), InputError> {
        if self.len == N {
            return Err(InputError::QueueFull);
        }
        self.slots[(self.head + self.len) % N] = Some(event);
        self.len += 1;
        Ok(())
    }

    pub fn pop(&mut self) -> Option<KeyEvent> {
        if self.len == 0 {
            return None;
        }
        let event = self.slots[self.head].take();
        self.head = (self.head + 1) % N;
        self.len -= 1;
        event
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub const fn capacity(&self) -> usize {
        N
    }
}

/// Filled by the IRQ1 handler, drained by the main loop.
pub static KEY_EVENTS: Mutex<KeyEventQueue<EVENT_QUEUE_CAPACITY>> =
    Mutex::new(KeyEventQueue::new());

/// Decode `scancode` and queue the result.
pub fn enqueue_scancode<const N: usize>(
    queue: &mut KeyEventQueue<N>,
    scancode: u8,
) -> Result<(), InputError> {
    match decode(scancode) {
        Some(event) => queue.push(event),
        None => Ok(()),
    }
}

/// Called from the keyboard interrupt handler. Never blocks: the handler
/// runs with interrupts off and main-loop holders of the lock disable them
/// too, so the lock is always free here.
pub fn add_scancode(scancode: u8) {
    let mut queue = KEY_EVENTS.lock();
    if let Err(e) = enqueue_scancode(&mut *queue, scancode) {
        log::warn!("{}; dropping scancode {:#04x}", e, scancode);
    }
}

/// Consumer side of `KEY_EVENTS`.
pub struct InterruptKeyboard {
    queue: &'static Mutex<KeyEventQueue<EVENT_QUEUE_CAPACITY>>,
}

impl InterruptKeyboard {
    pub fn new() -> Self {
        InterruptKeyboard::with_queue(&KEY_EVENTS)
    }

    pub fn with_queue(queue: &'static Mutex<KeyEventQueue<EVENT_QUEUE_CAPACITY>>) -> Self {
        InterruptKeyboard { queue }
    }

    /// Remove the oldest queued event.
    pub fn pop_event(&mut self) -> Option<KeyEvent> {
        interrupts::without_interrupts(|| self.take())
    }

    // caller must have interrupts disabled
    fn take(&self) -> Option<KeyEvent> {
        self.queue.lock().pop()
    }
}

impl KeySource for InterruptKeyboard {
    fn poll_event(&mut self) -> Option<KeyEvent> {
        self.pop_event()
    }

    fn read_event(&mut self) -> KeyEvent {
        loop {
            // check and sleep with interrupts off, or a key arriving between
            // the two would leave us halted until the next one
            interrupts::disable();
            let next = self.take();
            if let Some(event) = next {
                interrupts::enable();
                return event;
            }
            interrupts::enable_and_hlt();
        }
    }
}

/// Send reset command to keyboard controller (for reboot)
pub fn reset_cpu() -> ! {
    let mut ports = unsafe { HardwarePorts::new() };
    ports.write_u8(STATUS_COMMAND_PORT, CMD_RESET_CPU);
    crate::hlt_loop()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::port::testing::RecordingPorts;
    use std::vec::Vec;

    fn polled(scancodes: &[u8]) -> PolledKeyboard<RecordingPorts> {
        let mut ports = RecordingPorts::new();
        // one "data ready" status read per byte
        ports.script(STATUS_COMMAND_PORT, &std::vec![STATUS_OUTPUT_BUFFER_FULL; scancodes.len()]);
        ports.script(DATA_PORT, scancodes);
        PolledKeyboard::with_ports(ports)
    }

    #[test]
    fn letters_digits_and_space() {
        assert_eq!(decode(0x1E), Some(KeyEvent::Char('a')));
        assert_eq!(decode(0x2C), Some(KeyEvent::Char('z')));
        assert_eq!(decode(0x02), Some(KeyEvent::Char('1')));
        assert_eq!(decode(0x0B), Some(KeyEvent::Char('0')));
        assert_eq!(decode(0x39), Some(KeyEvent::Char(' ')));
        assert_eq!(decode(0x35), Some(KeyEvent::Char('/')));
    }

    #[test]
    fn enter_and_backspace_are_actions() {
        assert_eq!(decode(0x1C), Some(KeyEvent::Enter));
        assert_eq!(decode(0x0E), Some(KeyEvent::Backspace));
    }

    #[test]
    fn releases_never_produce_events() {
        for scancode in 0x80..=0xFFu8 {
            assert_eq!(decode(scancode), None, "scancode {:#x}", scancode);
        }
    }

    #[test]
    fn modifiers_and_unmapped_codes_are_ignored() {
        for scancode in [0x00, 0x1D, 0x2A, 0x36, 0x38, 0x3A, 0x48, 0x7F] {
            assert_eq!(decode(scancode), None, "scancode {:#x}", scancode);
        }
    }

    #[test]
    fn lookup_past_the_table_is_unmapped() {
        assert_eq!(US_QWERTY.lookup(0xFF), None);
    }

    #[test]
    fn try_read_checks_status_first() {
        let mut ports = RecordingPorts::new();
        ports.script(DATA_PORT, &[0x1E]);
        let mut keyboard = PolledKeyboard::with_ports(ports);
        assert_eq!(keyboard.try_read_scancode(), None);
        // data port left untouched
        assert_eq!(keyboard.ports.reads[&DATA_PORT].len(), 1);
    }

    #[test]
    fn blocking_read_skips_releases() {
        let mut keyboard = polled(&[0x9E, 0xAA, 0x1F]);
        assert_eq!(keyboard.read_event(), KeyEvent::Char('s'));
    }

    #[test]
    fn blocking_read_waits_on_an_idle_controller() {
        let mut ports = RecordingPorts::new();
        ports.script(STATUS_COMMAND_PORT, &[0, 0, STATUS_OUTPUT_BUFFER_FULL]);
        ports.script(DATA_PORT, &[0x10]);
        let mut keyboard = PolledKeyboard::with_ports(ports);
        assert_eq!(keyboard.read_event(), KeyEvent::Char('q'));
        assert_eq!(keyboard.ports.writes.len(), 2);
    }

    #[test]
    fn queue_is_fifo() {
        let mut queue = KeyEventQueue::<4>::new();
        for scancode in [0x10, 0x11, 0x12] {
            enqueue_scancode(&mut queue, scancode).unwrap();
        }
        let order: Vec<_> = core::iter::from_fn(|| queue.pop()).collect();
        assert_eq!(
            order,
            [KeyEvent::Char('q'), KeyEvent::Char('w'), KeyEvent::Char('e')]
        );
    }

    #[test]
    fn overflow_drops_the_newest_event() {
        let mut queue = KeyEventQueue::<3>::new();
        for c in ['a', 'b', 'c'] {
            queue.push(KeyEvent::Char(c)).unwrap();
        }
        assert_eq!(queue.push(KeyEvent::Char('d')), Err(InputError::QueueFull));
        assert_eq!(queue.len(), 3);
        assert_eq!(queue.pop(), Some(KeyEvent::Char('a')));
        assert_eq!(queue.pop(), Some(KeyEvent::Char('b')));
        assert_eq!(queue.pop(), Some(KeyEvent::Char('c')));
        assert_eq!(queue.pop(), None);
    }

    #[test]
    fn interleaved_producer_and_consumer_keep_order() {
        let mut queue = KeyEventQueue::<3>::new();
        let mut seen = Vec::new();
        let scancodes = [0x1E, 0x9E, 0x30, 0x2E, 0xAE, 0x20, 0x12, 0x21];
        for (i, &scancode) in scancodes.iter().enumerate() {
            enqueue_scancode(&mut queue, scancode).unwrap();
            if i % 2 == 1 {
                seen.extend(queue.pop());
            }
        }
        seen.extend(core::iter::from_fn(|| queue.pop()));
        let text: std::string::String = seen
            .iter()
            .map(|e| match e {
                KeyEvent::Char(c) => *c,
                _ => '?',
            })
            .collect();
        assert_eq!(text, "abcdef");
    }

    #[test]
    fn global_queue_drops_the_newest_scancode_when_full() {
        // the only test that touches KEY_EVENTS
        while KEY_EVENTS.lock().pop().is_some() {}

        for _ in 0..EVENT_QUEUE_CAPACITY {
            add_scancode(0x1E);
        }
        add_scancode(0x30);
        assert_eq!(KEY_EVENTS.lock().len(), EVENT_QUEUE_CAPACITY);

        let drained: Vec<_> = core::iter::from_fn(|| KEY_EVENTS.lock().pop()).collect();
        assert_eq!(drained, std::vec![KeyEvent::Char('a'); EVENT_QUEUE_CAPACITY]);
    }

    #[test]
    fn interrupt_keyboard_takes_in_arrival_order() {
        let queue: &'static Mutex<KeyEventQueue<EVENT_QUEUE_CAPACITY>> =
            std::boxed::Box::leak(std::boxed::Box::new(Mutex::new(KeyEventQueue::new())));
        let keyboard = InterruptKeyboard::with_queue(queue);

        enqueue_scancode(&mut *queue.lock(), 0x23).unwrap();
        enqueue_scancode(&mut *queue.lock(), 0xA3).unwrap();
        enqueue_scancode(&mut *queue.lock(), 0x17).unwrap();
        assert_eq!(keyboard.take(), Some(KeyEvent::Char('h')));
        enqueue_scancode(&mut *queue.lock(), 0x1C).unwrap();
        assert_eq!(keyboard.take(), Some(KeyEvent::Char('i')));
        assert_eq!(keyboard.take(), Some(KeyEvent::Enter));
        assert_eq!(keyboard.take(), None);
        // the lock is released between calls
        assert!(queue.try_lock().is_some());
    }

    #[test]
    fn releases_are_not_queued() {
        let mut queue = KeyEventQueue::<1>::new();
        enqueue_scancode(&mut queue, 0x9E).unwrap();
        assert!(queue.is_empty());
        assert_eq!(queue.capacity(), 1);
    }
}
