use std::collections::HashMap;
use std::io;
use std::net::{Ipv6Addr, SocketAddrV6};
use std::time::Duration;
use socket2::{Domain, Protocol, Socket, Type};
use anyhow::{Context, Result};
use crate::config::ListenerConfig;

/// Read timeout, so a blocked read notices cancellation promptly
pub const READ_TIMEOUT: Duration = Duration::from_millis(800);

/// Largest ICMPv6 message we accept in one read
pub const RECV_BUFFER_LEN: usize = 64 * 1024;

/// One read plus the receive-side metadata the kernel attached to it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Received {
    pub len: usize,
    pub source: Ipv6Addr,
    /// IPv6 header hop limit (IPV6_HOPLIMIT)
    pub hop_limit: Option<u8>,
    /// Arrival interface index (IPV6_PKTINFO)
    pub ifindex: Option<u32>,
}

/// Open a raw ICMPv6 socket. Needs root or CAP_NET_RAW.
///
/// The kernel strips the IPv6 header, so each read yields an ICMPv6 message
/// with its type byte first. Hop limit and arrival interface come back as
/// control messages.
pub fn open(config: &ListenerConfig) -> Result<Socket> {
    let socket = Socket::new(Domain::IPV6, Type::RAW, Some(Protocol::ICMPV6))
        .context("Failed to open raw ICMPv6 socket (requires CAP_NET_RAW)")?;

    if let Some(interface) = &config.interface {
        bind_interface(&socket, interface)?;
    }

    let addr = SocketAddrV6::new(config.listen, 0, 0, 0);
    socket
        .bind(&addr.into())
        .with_context(|| format!("Failed to bind ICMPv6 socket to {}", config.listen))?;

    socket
        .set_read_timeout(Some(READ_TIMEOUT))
        .context("Failed to set read timeout")?;

    enable_control_messages(&socket)?;

    Ok(socket)
}

#[cfg(any(target_os = "linux", target_os = "android", target_os = "fuchsia"))]
fn bind_interface(socket: &Socket, interface: &str) -> Result<()> {
    socket
        .bind_device(Some(interface.as_bytes()))
        .with_context(|| format!("Failed to bind to interface {}", interface))
}

#[cfg(not(any(target_os = "linux", target_os = "android", target_os = "fuchsia")))]
fn bind_interface(_socket: &Socket, interface: &str) -> Result<()> {
    tracing::warn!("Interface restriction to {} is not supported on this platform; capturing on all interfaces", interface);
    Ok(())
}

/// Ask for IPV6_HOPLIMIT and IPV6_PKTINFO on every read
#[cfg(any(target_os = "linux", target_os = "android"))]
pub fn enable_control_messages(socket: &Socket) -> Result<()> {
    use std::os::fd::AsRawFd;

    socket
        .set_recv_hoplimit_v6(true)
        .context("Failed to enable IPV6_RECVHOPLIMIT")?;

    let enable: libc::c_int = 1;
    // SAFETY: valid fd, option value points at a live c_int of the stated size
    let rc = unsafe {
        libc::setsockopt(
            socket.as_raw_fd(),
            libc::IPPROTO_IPV6,
            libc::IPV6_RECVPKTINFO,
            (&enable as *const libc::c_int).cast(),
            std::mem::size_of::<libc::c_int>() as libc::socklen_t,
        )
    };
    if rc < 0 {
        return Err(io::Error::last_os_error()).context("Failed to enable IPV6_RECVPKTINFO");
    }
    Ok(())
}

#[cfg(not(any(target_os = "linux", target_os = "android")))]
pub fn enable_control_messages(_socket: &Socket) -> Result<()> {
    tracing::warn!("Receive-side hop limit and interface metadata are not collected on this platform");
    Ok(())
}

/// Read one datagram along with its control messages.
#[cfg(any(target_os = "linux", target_os = "android"))]
pub fn recv(socket: &Socket, buf: &mut [u8]) -> io::Result<Received> {
    use std::os::fd::AsRawFd;

    // SAFETY: all-zero is a valid sockaddr_in6 and msghdr
    let mut source: libc::sockaddr_in6 = unsafe { std::mem::zeroed() };
    let mut msg: libc::msghdr = unsafe { std::mem::zeroed() };

    // room for an int hop limit and an in6_pktinfo, each behind a cmsghdr;
    // u64 keeps the buffer aligned for cmsghdr
    let mut control = [0u64; 16];
    let mut iov = libc::iovec {
        iov_base: buf.as_mut_ptr().cast(),
        iov_len: buf.len(),
    };

    msg.msg_name = (&mut source as *mut libc::sockaddr_in6).cast();
    msg.msg_namelen = std::mem::size_of::<libc::sockaddr_in6>() as libc::socklen_t;
    msg.msg_iov = &mut iov;
    msg.msg_iovlen = 1;
    msg.msg_control = control.as_mut_ptr().cast();
    msg.msg_controllen = std::mem::size_of_val(&control) as _;

    // SAFETY: every pointer in msg refers to a buffer that outlives the call
    let n = unsafe { libc::recvmsg(socket.as_raw_fd(), &mut msg, 0) };
    if n < 0 {
        return Err(io::Error::last_os_error());
    }

    let mut received = Received {
        len: n as usize,
        source: Ipv6Addr::from(source.sin6_addr.s6_addr),
        hop_limit: None,
        ifindex: None,
    };

    // SAFETY: msg was filled in by recvmsg; the CMSG_* macros stay inside msg_controllen
    let mut cmsg = unsafe { libc::CMSG_FIRSTHDR(&msg) };
    while !cmsg.is_null() {
        let header = unsafe { &*cmsg };
        if header.cmsg_level == libc::IPPROTO_IPV6 {
            let data = unsafe { libc::CMSG_DATA(cmsg) };
            match header.cmsg_type {
                libc::IPV6_HOPLIMIT => {
                    let hops = unsafe { std::ptr::read_unaligned(data as *const libc::c_int) };
                    received.hop_limit = u8::try_from(hops).ok();
                }
                libc::IPV6_PKTINFO => {
                    let info = unsafe { std::ptr::read_unaligned(data as *const libc::in6_pktinfo) };
                    received.ifindex = Some(info.ipi6_ifindex as u32).filter(|index| *index != 0);
                }
                _ => {}
            }
        }
        cmsg = unsafe { libc::CMSG_NXTHDR(&msg, cmsg) };
    }

    Ok(received)
}

#[cfg(not(any(target_os = "linux", target_os = "android")))]
pub fn recv(socket: &Socket, buf: &mut [u8]) -> io::Result<Received> {
    use std::mem::MaybeUninit;

    // SAFETY: u8 and MaybeUninit<u8> share a layout, and recv_from only writes initialized bytes
    let uninit = unsafe { &mut *(buf as *mut [u8] as *mut [MaybeUninit<u8>]) };
    let (len, from) = socket.recv_from(uninit)?;
    let source = match from.as_socket() {
        Some(std::net::SocketAddr::V6(addr)) => *addr.ip(),
        _ => Ipv6Addr::UNSPECIFIED,
    };

    Ok(Received { len, source, hop_limit: None, ifindex: None })
}

/// Interface names by index, resolved once per index
#[derive(Debug, Default)]
pub struct InterfaceNames {
    names: HashMap<u32, Option<String>>,
}

impl InterfaceNames {
    pub fn get(&mut self, index: u32) -> Option<String> {
        self.names
            .entry(index)
            .or_insert_with(|| interface_name(index))
            .clone()
    }
}

#[cfg(unix)]
fn interface_name(index: u32) -> Option<String> {
    let mut name = [0 as libc::c_char; libc::IF_NAMESIZE];
    // SAFETY: buffer is IF_NAMESIZE bytes as if_indextoname requires
    let result = unsafe { libc::if_indextoname(index, name.as_mut_ptr()) };
    if result.is_null() {
        return None;
    }
    // SAFETY: on success the buffer holds a NUL-terminated name
    let name = unsafe { std::ffi::CStr::from_ptr(name.as_ptr()) };
    name.to_str().ok().map(str::to_string)
}

#[cfg(not(unix))]
fn interface_name(_index: u32) -> Option<String> {
    None
}
